use async_trait::async_trait;
use ops_application::command_handler::CommandHandler;
use ops_application::context::Operations;
use ops_application::dispatch::{DispatchCommand, EmitEvent};
use ops_application::error::OperationResult;
use ops_application::event_handler::OnSuccessHandler;
use ops_application::registry::HandlerRegistry;
use ops_macros::{command, internal_event};
use std::sync::Arc;

#[command(output = u32)]
#[derive(Debug)]
struct CreateUser {
    name: String,
}

#[internal_event]
#[derive(Debug, Clone)]
struct UserCreated {
    user_id: u32,
}

struct CreateUserHandler;

#[async_trait]
impl CommandHandler<CreateUser> for CreateUserHandler {
    async fn handle(&self, cmd: &CreateUser) -> OperationResult<u32> {
        println!("CreateUser: name={}", cmd.name);
        UserCreated::new(42).emit().await?;
        Ok(42)
    }
}

struct WelcomeUser;

#[async_trait]
impl OnSuccessHandler<UserCreated> for WelcomeUser {
    async fn handle(&self, event: &UserCreated) -> OperationResult<()> {
        println!("welcome mail queued: user_id={}", event.user_id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateUser, _>(Arc::new(CreateUserHandler));
    registry.register_on_success::<UserCreated, _>(Arc::new(WelcomeUser));

    let ops = Arc::new(Operations::builder().registry(registry).build());

    let id = ops
        .enter(async {
            CreateUser::new("Alice".into()).dispatch().await
        })
        .await?;
    println!("created: {id:?}");

    // 无激活作用域 -> 空操作，返回 None
    let dropped = CreateUser::new("Eve".into()).dispatch().await?;
    println!("outside scope: {dropped:?}");

    Ok(())
}
