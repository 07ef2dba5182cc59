// ── Interactive SSH CLI session ──
//
// One `SshSession` is one authenticated PTY shell on one device. Input is
// written line by line and output is read until the device prompt comes
// back, the same way an operator would drive the CLI by hand.

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::Error;
use crate::prompt::{self, ReadBuffer};
use crate::transport::TransportConfig;

/// Client-side handler. Device fleets rarely carry pinned host keys, so
/// every server key is accepted.
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// An authenticated interactive shell on a single device.
pub struct SshSession {
    host: String,
    handle: Handle<AcceptAnyHostKey>,
    channel: Channel<Msg>,
    read_timeout: std::time::Duration,
    /// Hostname part of the prompt, learned during session preparation.
    base_prompt: Option<String>,
    /// Output received but not yet consumed by a prompt match.
    buffer: ReadBuffer,
    closed: bool,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("host", &self.host)
            .field("base_prompt", &self.base_prompt)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl SshSession {
    /// Connect, authenticate with a password, open a PTY shell, and prepare
    /// the terminal (paging off, wide lines).
    pub async fn connect(
        host: &str,
        username: &str,
        password: &SecretString,
        config: &TransportConfig,
    ) -> Result<Self, Error> {
        let timeout_secs = config.connect_timeout.as_secs();
        let ssh_config = config.build_ssh_config();

        let connect = client::connect(ssh_config, (host, config.port), AcceptAnyHostKey);
        let mut handle = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| Error::Timeout {
                host: host.to_owned(),
                timeout_secs,
            })?
            .map_err(|e| Error::from_connect(host, timeout_secs, e))?;

        let authenticated = tokio::time::timeout(
            config.connect_timeout,
            handle.authenticate_password(username, password.expose_secret()),
        )
        .await
        .map_err(|_| Error::Timeout {
            host: host.to_owned(),
            timeout_secs,
        })??;

        if !authenticated {
            return Err(Error::Authentication {
                host: host.to_owned(),
                username: username.to_owned(),
            });
        }
        debug!(host, "authenticated");

        let mut channel = handle.channel_open_session().await?;
        channel
            .request_pty(false, "vt100", config.terminal_width, 24, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;

        let mut session = Self {
            host: host.to_owned(),
            handle,
            channel,
            read_timeout: config.read_timeout,
            base_prompt: None,
            buffer: ReadBuffer::default(),
            closed: false,
        };

        session.prepare(&config.preparation).await?;
        Ok(session)
    }

    /// Device address this session is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Wait for the login banner to settle on a prompt, remember its
    /// hostname, then run the preparation commands.
    async fn prepare(&mut self, preparation: &[String]) -> Result<(), Error> {
        let banner = prompt::normalize(&self.read_until_prompt().await?);
        if let Some(found) = prompt::trailing_prompt(&banner, None) {
            self.base_prompt = Some(prompt::hostname_from_prompt(found).to_owned());
        }

        for command in preparation {
            self.write_line(command).await?;
            self.read_until_prompt().await?;
        }
        Ok(())
    }

    /// Probe for the current prompt (e.g. `core-sw01#`).
    pub async fn find_prompt(&mut self) -> Result<String, Error> {
        self.write_line("").await?;
        let text = prompt::normalize(&self.read_until_prompt().await?);
        let found = prompt::trailing_prompt(&text, None)
            .map(str::to_owned)
            .ok_or_else(|| Error::PromptNotFound {
                host: self.host.clone(),
                timeout_secs: self.read_timeout.as_secs(),
                tail: tail_of(&text),
            })?;

        self.base_prompt = Some(prompt::hostname_from_prompt(&found).to_owned());
        Ok(found)
    }

    /// Send one command and return its output, without echo or prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<String, Error> {
        trace!(host = %self.host, command, "sending command");
        self.write_line(command).await?;
        let transcript = self.read_until_prompt().await?;
        Ok(prompt::command_output(
            &transcript,
            command,
            self.base_prompt.as_deref(),
        ))
    }

    /// Enter configuration mode, send every line in order, and leave it
    /// again. Returns the full normalised transcript.
    pub async fn send_config_set(&mut self, lines: &[String]) -> Result<String, Error> {
        let mut transcript = String::new();

        self.write_line("configure terminal").await?;
        transcript.push_str(&self.read_until_prompt().await?);

        for line in lines {
            trace!(host = %self.host, line, "sending config line");
            self.write_line(line).await?;
            transcript.push_str(&self.read_until_prompt().await?);
        }

        self.write_line("end").await?;
        transcript.push_str(&self.read_until_prompt().await?);

        Ok(prompt::normalize(&transcript))
    }

    /// Close the shell and disconnect. Safe to call more than once; errors
    /// during teardown are swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = self.channel.eof().await;
        let _ = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await;
        debug!(host = %self.host, "session closed");
    }

    async fn write_line(&mut self, line: &str) -> Result<(), Error> {
        if self.closed {
            return Err(Error::SessionClosed {
                host: self.host.clone(),
            });
        }
        let data = format!("{line}\n");
        self.channel.data(data.as_bytes()).await?;
        Ok(())
    }

    /// Read channel output until the buffer ends in a prompt, then hand back
    /// everything read so far.
    async fn read_until_prompt(&mut self) -> Result<String, Error> {
        let deadline = Instant::now() + self.read_timeout;

        loop {
            if self.buffer.ends_with_prompt(self.base_prompt.as_deref()) {
                return Ok(self.buffer.take());
            }

            let Ok(msg) = tokio::time::timeout_at(deadline, self.channel.wait()).await else {
                return Err(Error::PromptNotFound {
                    host: self.host.clone(),
                    timeout_secs: self.read_timeout.as_secs(),
                    tail: tail_of(&self.buffer.text()),
                });
            };

            match msg {
                Some(ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. }) => {
                    self.buffer.push(data);
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    return Err(Error::ChannelClosed {
                        host: self.host.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }
}

fn tail_of(text: &str) -> String {
    let trimmed = text.trim_end();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(79)
        .map_or(0, |(idx, _)| idx);
    trimmed[start..].to_owned()
}

#[cfg(test)]
mod tests {
    use super::tail_of;

    #[test]
    fn tail_keeps_last_eighty_chars() {
        let text = "x".repeat(200);
        assert_eq!(tail_of(&text).len(), 80);
        assert_eq!(tail_of("short\n"), "short");
    }
}
