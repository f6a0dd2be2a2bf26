use anyhow::Result;
use atrium_application::chat::{ChatOrchestrator, ChatSession, GenerateOutcome};
use atrium_core::entity::Message;
use atrium_core::service::DataService;
use std::sync::Arc;

pub async fn send(service: Arc<dyn DataService>, chat_id: &str, text: &str) -> Result<()> {
    let orchestrator = ChatOrchestrator::new(service);
    orchestrator.select_chat(chat_id).await?;

    let outcome = orchestrator.send_message(chat_id, Message::user(text)).await?;
    report(outcome);
    print_session(&orchestrator.snapshot().await);
    Ok(())
}

pub async fn regenerate(service: Arc<dyn DataService>, chat_id: &str) -> Result<()> {
    let orchestrator = ChatOrchestrator::new(service);
    orchestrator.select_chat(chat_id).await?;

    let outcome = orchestrator.regenerate_response().await?;
    report(outcome);
    print_session(&orchestrator.snapshot().await);
    Ok(())
}

pub async fn show(service: Arc<dyn DataService>, chat_id: &str) -> Result<()> {
    let orchestrator = ChatOrchestrator::new(service);
    orchestrator.select_chat(chat_id).await?;
    print_session(&orchestrator.snapshot().await);
    Ok(())
}

fn report(outcome: GenerateOutcome) {
    match outcome {
        GenerateOutcome::Generated => {}
        GenerateOutcome::Declined => eprintln!("No reply was generated."),
        GenerateOutcome::Skipped => eprintln!("A reply is already being generated."),
    }
}

fn print_session(session: &ChatSession) {
    let name = if session.chat_name.is_empty() {
        session.chat_id.as_deref().unwrap_or("chat")
    } else {
        session.chat_name.as_str()
    };
    match &session.agent {
        Some(agent) => println!("# {} (agent: {})", name, agent.name),
        None => println!("# {}", name),
    }
    for message in &session.messages {
        let speaker = message
            .assistant_name
            .clone()
            .unwrap_or_else(|| message.role.to_string());
        println!("[{}] {}", speaker, message.content);
    }
    if !session.functions.is_empty() {
        println!("tasks: {}", session.functions.join(", "));
    }
}
