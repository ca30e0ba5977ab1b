use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// 命令上下文数据
///
/// 以字符串为键的临时键值存储，随命令实例流转：
/// - 主处理器写入执行过程中产生的状态；
/// - 后置处理器按键与类型读取；
/// - 值以 `Arc<dyn Any>` 存放，读取时按请求类型还原，类型不符返回 `None`。
#[derive(Default)]
pub struct ContextData {
    inner: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ContextData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个键值；同键覆盖旧值
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.inner
            .lock()
            .expect("context data lock poisoned")
            .insert(key.into(), Arc::new(value));
    }

    /// 按键与类型读取；键不存在或类型不符返回 `None`
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let guard = self.inner.lock().expect("context data lock poisoned");
        guard.get(key).cloned()?.downcast::<T>().ok()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .lock()
            .expect("context data lock poisoned")
            .contains_key(key)
    }
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock().expect("context data lock poisoned");
        f.debug_set().entries(guard.keys()).finish()
    }
}
