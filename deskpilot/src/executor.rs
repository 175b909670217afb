//! External invocations against the host.
//!
//! Every action recipe ends up here as an [`Invocation`]. The system executor runs
//! processes with a hard timeout and converts every failure into an [`Outcome`]
//! value, so nothing raised by an external tool escapes a handler.

use async_trait::async_trait;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use log::{debug, error, info, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// One external call against the host OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A PowerShell script, run with `-ExecutionPolicy Bypass`
    PowerShell(String),
    /// A command line for the platform shell (`cmd /C` or `sh -c`)
    Shell(String),
    /// Launch a program without waiting for it
    Spawn { program: String, args: Vec<String> },
    /// Hand a URI to the desktop's default handler
    OpenUri(String),
    /// Send a synthetic key chord
    Keys(KeyChord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Tab,
    Escape,
    F4,
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    PrintScreen,
    VolumeMute,
    MediaPlayPause,
    MediaNextTrack,
    MediaPrevTrack,
    MediaStop,
}

/// Modifiers held while `key` is clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<Modifier>,
    pub key: KeyCode,
}

impl KeyChord {
    pub fn single(key: KeyCode) -> Self {
        Self {
            modifiers: Vec::new(),
            key,
        }
    }

    pub fn with(modifiers: &[Modifier], key: KeyCode) -> Self {
        Self {
            modifiers: modifiers.to_vec(),
            key,
        }
    }
}

/// What happened when an invocation ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The process exited; `output` is stdout and stderr combined and trimmed
    Completed { success: bool, output: String },
    /// A detached program or key chord was dispatched
    Launched,
    TimedOut(Duration),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Completed { success: true, .. } | Outcome::Launched
        )
    }

    /// Captured output of a completed process, if it printed anything
    pub fn output(&self) -> Option<&str> {
        match self {
            Outcome::Completed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    /// Human-readable failure text, `None` if the invocation succeeded
    pub fn failure_text(&self) -> Option<String> {
        match self {
            Outcome::Completed { success: true, .. } | Outcome::Launched => None,
            Outcome::Completed {
                success: false,
                output,
            } => {
                if output.is_empty() {
                    Some("Command exited with an error".to_string())
                } else {
                    Some(output.clone())
                }
            }
            Outcome::TimedOut(limit) => {
                Some(format!("Command timed out after {}s", limit.as_secs()))
            }
            Outcome::Failed(reason) => Some(reason.clone()),
        }
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Outcome;
}

/// Runs invocations against the real host
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a command to completion, killing it if it outlives the timeout
    async fn run_captured(&self, mut command: Command) -> Outcome {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to start command: {}", e);
                return Outcome::Failed(format!("Failed to run: {}", e));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                let combined = combined.trim().to_string();
                if output.status.success() {
                    info!(
                        "Command executed successfully ({} chars of output)",
                        combined.len()
                    );
                } else {
                    error!("Command failed ({}): {}", output.status, combined);
                }
                Outcome::Completed {
                    success: output.status.success(),
                    output: combined,
                }
            }
            Ok(Err(e)) => {
                error!("Failed to collect command output: {}", e);
                Outcome::Failed(format!("Failed to run: {}", e))
            }
            Err(_) => {
                warn!("Command timed out after {:?}", self.timeout);
                Outcome::TimedOut(self.timeout)
            }
        }
    }

    #[cfg(target_os = "windows")]
    async fn run_powershell(&self, script: &str) -> Outcome {
        let mut command = Command::new("powershell");
        command
            .arg("-NoProfile")
            .arg("-ExecutionPolicy")
            .arg("Bypass")
            .arg("-Command")
            .arg(script);
        self.run_captured(command).await
    }

    #[cfg(not(target_os = "windows"))]
    async fn run_powershell(&self, _script: &str) -> Outcome {
        Outcome::Failed("PowerShell recipes are only supported on Windows".to_string())
    }

    async fn open_uri(&self, uri: &str) -> Outcome {
        #[cfg(target_os = "windows")]
        let command = shell_command(&format!("start \"\" \"{}\"", uri.replace('"', "%22")));
        #[cfg(target_os = "macos")]
        let command = {
            let mut command = Command::new("open");
            command.arg(uri);
            command
        };
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let command = {
            let mut command = Command::new("xdg-open");
            command.arg(uri);
            command
        };
        self.run_captured(command).await
    }
}

#[async_trait]
impl Executor for SystemExecutor {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        debug!("Running invocation: {:?}", invocation);
        match invocation {
            Invocation::PowerShell(script) => self.run_powershell(script).await,
            Invocation::Shell(line) => self.run_captured(shell_command(line)).await,
            Invocation::Spawn { program, args } => spawn_detached(program, args),
            Invocation::OpenUri(uri) => self.open_uri(uri).await,
            Invocation::Keys(chord) => send_chord(chord.clone()).await,
        }
    }
}

#[cfg(target_os = "windows")]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    // cmd.exe does its own quote parsing, so the line goes through untouched.
    command.arg("/C").raw_arg(line);
    command
}

#[cfg(not(target_os = "windows"))]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

fn spawn_detached(program: &str, args: &[String]) -> Outcome {
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => {
            info!("Launched {}", program);
            Outcome::Launched
        }
        Err(e) => {
            error!("Failed to launch {}: {}", program, e);
            Outcome::Failed(format!("Failed to launch {}: {}", program, e))
        }
    }
}

async fn send_chord(chord: KeyChord) -> Outcome {
    match tokio::task::spawn_blocking(move || press_chord(&chord)).await {
        Ok(Ok(())) => Outcome::Launched,
        Ok(Err(e)) => {
            error!("Key chord failed: {}", e);
            Outcome::Failed(e)
        }
        Err(e) => Outcome::Failed(format!("Key input task failed: {}", e)),
    }
}

fn press_chord(chord: &KeyChord) -> Result<(), String> {
    let key = enigo_key(chord.key)?;
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| format!("Failed to initialize input: {}", e))?;

    for modifier in &chord.modifiers {
        enigo
            .key(modifier_key(*modifier), Direction::Press)
            .map_err(|e| format!("Failed to press {:?}: {}", modifier, e))?;
    }
    let result = enigo
        .key(key, Direction::Click)
        .map_err(|e| format!("Failed to click {:?}: {}", chord.key, e));
    for modifier in chord.modifiers.iter().rev() {
        if let Err(e) = enigo.key(modifier_key(*modifier), Direction::Release) {
            warn!("Failed to release {:?}: {}", modifier, e);
        }
    }
    result
}

fn modifier_key(modifier: Modifier) -> Key {
    match modifier {
        Modifier::Control => Key::Control,
        Modifier::Alt => Key::Alt,
        Modifier::Shift => Key::Shift,
        Modifier::Meta => Key::Meta,
    }
}

fn enigo_key(key: KeyCode) -> Result<Key, String> {
    match key {
        KeyCode::Char(c) => Ok(Key::Unicode(c)),
        KeyCode::Tab => Ok(Key::Tab),
        KeyCode::Escape => Ok(Key::Escape),
        KeyCode::F4 => Ok(Key::F4),
        KeyCode::LeftArrow => Ok(Key::LeftArrow),
        KeyCode::RightArrow => Ok(Key::RightArrow),
        KeyCode::UpArrow => Ok(Key::UpArrow),
        KeyCode::DownArrow => Ok(Key::DownArrow),
        other => virtual_key(other),
    }
}

/// Win32 virtual-key codes for keys with no portable enigo variant
#[cfg(target_os = "windows")]
fn virtual_key(key: KeyCode) -> Result<Key, String> {
    let code = match key {
        KeyCode::PrintScreen => 0x2C,
        KeyCode::VolumeMute => 0xAD,
        KeyCode::MediaNextTrack => 0xB0,
        KeyCode::MediaPrevTrack => 0xB1,
        KeyCode::MediaStop => 0xB2,
        KeyCode::MediaPlayPause => 0xB3,
        other => return Err(format!("No virtual key for {:?}", other)),
    };
    Ok(Key::Other(code))
}

#[cfg(not(target_os = "windows"))]
fn virtual_key(key: KeyCode) -> Result<Key, String> {
    Err(format!("{:?} is only supported on Windows", key))
}
