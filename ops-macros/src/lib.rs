use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    Ident, Item, ItemStruct, Result as SynResult, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input, spanned::Spanned,
};

/// 命令宏
/// - 追加字段：`meta: OperationMeta`, `context: ContextData`（若缺失）并置于字段最前
/// - 自动实现 `::ops_domain::operation::Operation` 与 `::ops_domain::command::Command`
///   （`NAME` 取类型名，`Output` 取参数或 `()`）
/// - 生成以用户字段为参数的 `new` 构造器
/// - 支持参数：`#[command(output = Type)]`，默认 `()`
#[proc_macro_attribute]
pub fn command(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as OutputAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[command] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let user_fields = match inject_front_fields(
        &mut st,
        &[
            ("meta", syn::parse_quote! { meta: ::ops_domain::operation::OperationMeta }),
            (
                "context",
                syn::parse_quote! { context: ::ops_domain::context_data::ContextData },
            ),
        ],
    ) {
        Ok(f) => f,
        Err(err) => return err.to_compile_error().into(),
    };

    let output_ty = cfg.output_ty.unwrap_or_else(|| syn::parse_quote! { () });

    let out_struct = ItemStruct { ..st };
    let ident = &out_struct.ident;
    let name_lit = syn::LitStr::new(&ident.to_string(), ident.span());
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let params = user_fields.iter().map(|f| {
        let id = &f.ident;
        let ty = &f.ty;
        quote! { #id: #ty }
    });
    let inits = user_fields.iter().map(|f| {
        let id = &f.ident;
        quote! { #id }
    });

    let expanded = quote! {
        #out_struct

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new( #( #params, )* ) -> Self {
                Self {
                    meta: ::ops_domain::operation::OperationMeta::new(),
                    context: ::ops_domain::context_data::ContextData::new(),
                    #( #inits, )*
                }
            }
        }

        impl #impl_generics ::ops_domain::operation::Operation for #ident #ty_generics #where_clause {
            fn meta(&self) -> &::ops_domain::operation::OperationMeta {
                &self.meta
            }
        }

        impl #impl_generics ::ops_domain::command::Command for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name_lit;
            type Output = #output_ty;

            fn context(&self) -> &::ops_domain::context_data::ContextData {
                &self.context
            }
        }
    };

    TokenStream::from(expanded)
}

/// 查询宏
/// - 追加字段：`meta: OperationMeta`（若缺失）并置于字段最前
/// - 自动实现 `Operation` 与 `Query`（`NAME` 取类型名，`Output` 取参数）
/// - 支持参数：`#[query(output = Type)]`，默认 `()`
#[proc_macro_attribute]
pub fn query(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as OutputAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[query] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let user_fields = match inject_front_fields(
        &mut st,
        &[("meta", syn::parse_quote! { meta: ::ops_domain::operation::OperationMeta })],
    ) {
        Ok(f) => f,
        Err(err) => return err.to_compile_error().into(),
    };

    let output_ty = cfg.output_ty.unwrap_or_else(|| syn::parse_quote! { () });

    let out_struct = ItemStruct { ..st };
    let ident = &out_struct.ident;
    let name_lit = syn::LitStr::new(&ident.to_string(), ident.span());
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let params = user_fields.iter().map(|f| {
        let id = &f.ident;
        let ty = &f.ty;
        quote! { #id: #ty }
    });
    let inits = user_fields.iter().map(|f| {
        let id = &f.ident;
        quote! { #id }
    });

    let expanded = quote! {
        #out_struct

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new( #( #params, )* ) -> Self {
                Self {
                    meta: ::ops_domain::operation::OperationMeta::new(),
                    #( #inits, )*
                }
            }
        }

        impl #impl_generics ::ops_domain::operation::Operation for #ident #ty_generics #where_clause {
            fn meta(&self) -> &::ops_domain::operation::OperationMeta {
                &self.meta
            }
        }

        impl #impl_generics ::ops_domain::query::Query for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name_lit;
            type Output = #output_ty;
        }
    };

    TokenStream::from(expanded)
}

/// 内部事件宏
/// - 追加字段：`meta: EventMeta`（若缺失）并置于字段最前
/// - 自动实现 `Operation` 与 `InternalEvent`（`event_name` 取类型名）
/// - 结构体需自行派生 `Debug`（发布还需 `Clone`）
#[proc_macro_attribute]
pub fn internal_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    let _ = attr; // 暂不支持属性参数
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[internal_event] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let user_fields = match inject_front_fields(
        &mut st,
        &[("meta", syn::parse_quote! { meta: ::ops_domain::internal_event::EventMeta })],
    ) {
        Ok(f) => f,
        Err(err) => return err.to_compile_error().into(),
    };

    let out_struct = ItemStruct { ..st };
    let ident = &out_struct.ident;
    let name_lit = syn::LitStr::new(&ident.to_string(), ident.span());
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let params = user_fields.iter().map(|f| {
        let id = &f.ident;
        let ty = &f.ty;
        quote! { #id: #ty }
    });
    let inits = user_fields.iter().map(|f| {
        let id = &f.ident;
        quote! { #id }
    });

    let expanded = quote! {
        #out_struct

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new( #( #params, )* ) -> Self {
                Self {
                    meta: ::ops_domain::internal_event::EventMeta::new(),
                    #( #inits, )*
                }
            }
        }

        impl #impl_generics ::ops_domain::operation::Operation for #ident #ty_generics #where_clause {
            fn meta(&self) -> &::ops_domain::operation::OperationMeta {
                self.meta.operation()
            }
        }

        impl #impl_generics ::ops_domain::internal_event::InternalEvent for #ident #ty_generics #where_clause {
            fn event_meta(&self) -> &::ops_domain::internal_event::EventMeta {
                &self.meta
            }

            fn event_name(&self) -> &'static str {
                #name_lit
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };

    TokenStream::from(expanded)
}

// 重建具名字段结构体：注入字段置前（已存在则复用原定义），
// 返回除注入字段外的用户字段（供 new() 生成参数）。
fn inject_front_fields(
    st: &mut ItemStruct,
    injected: &[(&str, syn::Field)],
) -> SynResult<Vec<syn::Field>> {
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return Err(syn::Error::new(
                st.span(),
                "only supports named-field struct",
            ));
        }
    };

    let injected_names: Vec<&str> = injected.iter().map(|(name, _)| *name).collect();

    let user_fields: Vec<syn::Field> = fields_named
        .named
        .iter()
        .filter(|f| {
            f.ident
                .as_ref()
                .map(|i| !injected_names.iter().any(|n| i == n))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    let mut new_named: Punctuated<syn::Field, Token![,]> = Punctuated::new();

    for (name, default_field) in injected {
        let existed = fields_named
            .named
            .iter()
            .find(|f| f.ident.as_ref().map(|i| i == name).unwrap_or(false))
            .cloned();
        match existed {
            Some(f) => new_named.push(f),
            None => new_named.push(default_field.clone()),
        }
    }

    for f in user_fields.iter().cloned() {
        new_named.push(f);
    }

    fields_named.named = new_named;

    Ok(user_fields)
}

// 解析键值参数：output = <Type>
struct OutputAttrConfig {
    output_ty: Option<Type>,
}

impl Parse for OutputAttrConfig {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut output_ty: Option<Type> = None;

        if input.is_empty() {
            return Ok(Self { output_ty });
        }

        let pairs: Punctuated<KvType, Token![,]> =
            Punctuated::<KvType, Token![,]>::parse_terminated(input)?;

        for kv in pairs.into_iter() {
            let key = kv.key.to_string();
            match key.as_str() {
                "output" => {
                    if output_ty.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'output' in attribute",
                        ));
                    }
                    output_ty = Some(kv.ty);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key in attribute; expected 'output'",
                    ));
                }
            }
        }

        Ok(Self { output_ty })
    }
}

struct KvType {
    key: Ident,
    #[allow(dead_code)]
    eq: Token![=],
    ty: Type,
}

impl Parse for KvType {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let key: Ident = input.parse()?;
        let eq: Token![=] = input.parse()?;
        let ty: Type = input.parse()?;
        Ok(Self { key, eq, ty })
    }
}
