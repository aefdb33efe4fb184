//! Timed console prompt
//!
//! 사용자가 제한 시간 안에 Enter를 누르는지 기다리는 프리미티브입니다.
//! 표준 입력은 전용 스레드 하나가 줄 단위로 읽어 채널로 넘깁니다.
//! 블로킹 read는 취소할 수 없기 때문에 tokio 블로킹 풀 대신 분리된 스레드를 쓰며,
//! 런타임 종료나 프로세스 종료를 막지 않습니다.

use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Spawns the stdin line reader. The thread ends on EOF, on a read error or
/// once every receiver is gone.
pub fn spawn_stdin_reader(tx: mpsc::UnboundedSender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::debug!("stdin read failed: {}", e);
                    break;
                }
            };
            if tx.send(line).is_err() {
                break;
            }
        }
        tracing::debug!("stdin reader thread exiting");
    })
}

/// Races operator input against a deadline.
pub struct TimedPrompt {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
    timeout: Duration,
}

impl TimedPrompt {
    /// Prompt fed by a fresh stdin reader thread.
    pub fn stdin(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_stdin_reader(tx);
        Self::from_receiver(rx, timeout)
    }

    pub fn from_receiver(lines: mpsc::UnboundedReceiver<String>, timeout: Duration) -> Self {
        Self {
            lines: Mutex::new(lines),
            timeout,
        }
    }

    /// Default window used by the workflow.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits up to `timeout` for one line of input.
    ///
    /// Returns `true` only if a line arrived and the elapsed time is strictly
    /// below `timeout`. A line that arrives after the window closed stays
    /// queued for the next prompt. A closed input never wins the race.
    pub async fn await_interrupt(&self, timeout: Duration) -> bool {
        let mut lines = self.lines.lock().await;

        let started = Instant::now();
        let token = CancellationToken::new();

        let input = async {
            tokio::select! {
                _ = token.cancelled() => {}
                line = lines.recv() => match line {
                    Some(_) => token.cancel(),
                    None => token.cancelled().await,
                },
            }
        };
        let deadline = async {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(timeout) => token.cancel(),
            }
        };
        tokio::join!(input, deadline);

        let elapsed = started.elapsed();
        let interrupted = elapsed < timeout;
        tracing::debug!(
            "Prompt finished after {:?} (timeout {:?}, interrupted: {})",
            elapsed,
            timeout,
            interrupted
        );
        interrupted
    }

    /// Waits for one line without a deadline. `None` once input is closed.
    pub async fn read_line(&self) -> Option<String> {
        let mut lines = self.lines.lock().await;
        lines.recv().await
    }

    /// Capped pause before the process ends, so error text stays readable.
    pub async fn hold_before_exit(&self) {
        println!(
            "Press Enter to avoid automatic application closure in {} seconds...",
            self.timeout.as_secs()
        );
        if self.await_interrupt(self.timeout).await {
            println!("Press Enter to manually close application.");
            self.read_line().await;
        }
    }
}
