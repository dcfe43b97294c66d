use bank_agent_orchestrator::{AgentServices, AppConfig, Orchestrator};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing; quiet by default so logs don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let services = AgentServices::from_config(&config).await?;
    let mut orchestrator = Orchestrator::new(services);

    info!(session_id = %orchestrator.state().session_id, "Terminal session started");

    println!("=== Bank Assistant ===");
    println!("Type /reset to start over, /state to inspect the session.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/reset" => {
                orchestrator.reset();
                println!("(session reset)\n");
                continue;
            }
            "/state" => {
                println!("{}\n", serde_json::to_string_pretty(orchestrator.state())?);
                continue;
            }
            _ => {}
        }

        let reply = orchestrator.process_message(&line).await;
        println!("\n[{}] {}\n", orchestrator.state().active_agent, reply);

        if !orchestrator.state().conversation_active {
            break;
        }
    }

    info!(session_id = %orchestrator.state().session_id, "Terminal session ended");
    Ok(())
}
