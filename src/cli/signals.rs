//! Signal handling for the replay harness

use colored::Colorize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Interruptions delivered while a replay is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
}

/// Listens for SIGINT/SIGTERM and reports them on a channel
pub struct InterruptSignal {
    receiver: mpsc::Receiver<Interruption>,
}

impl InterruptSignal {
    /// Install handlers for SIGINT and SIGTERM
    pub fn install() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(4);

        let tx_int = tx.clone();
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                eprintln!("{} Received SIGINT", "↓".cyan());
                if tx_int.send(Interruption::Interrupt).await.is_err() {
                    break;
                }
            }
        });

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                eprintln!("{} Received SIGTERM", "↓".cyan());
                if tx.send(Interruption::Terminate).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { receiver: rx })
    }

    /// Wait for the next interruption
    pub async fn recv(&mut self) -> Option<Interruption> {
        self.receiver.recv().await
    }
}
