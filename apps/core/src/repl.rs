//! Line-oriented chat loop used by the terminal binary.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, warn};

use crate::actors::supervisor::SupervisorHandle;
use crate::brain::ResponseTemplates;
use crate::error::AppError;

/// Runs one conversation over `input` until end of input, `/quit` or `/exit`.
///
/// Bytes that are not valid UTF-8 are replaced, so a garbled line still gets
/// an answer. Returns the id of the session the conversation used.
pub async fn run_chat<R, W>(
    supervisor: &SupervisorHandle,
    templates: &ResponseTemplates,
    mut input: R,
    output: &mut W,
) -> Result<String, AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let session_id = supervisor.create_session().await?;
    writeln!(output, "CareerGPT: {}\n", templates.greeting)?;

    let mut buf = Vec::new();
    loop {
        write!(output, "You: ")?;
        output.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if std::str::from_utf8(&buf).is_err() {
            warn!("input line was not valid UTF-8; invalid bytes replaced");
        }

        let reply = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => match supervisor.clear_session(session_id.clone()).await {
                Ok(()) => templates.greeting.clone(),
                Err(e) => {
                    error!(error = %e, "failed to clear session");
                    templates.technical_support.clone()
                }
            },
            text => match supervisor
                .process_message(session_id.clone(), text.to_string())
                .await
            {
                Ok(reply) => reply.content,
                Err(e) => {
                    error!(error = %e, "turn failed");
                    templates.technical_support.clone()
                }
            },
        };
        writeln!(output, "CareerGPT: {}\n", reply)?;
    }

    Ok(session_id)
}
