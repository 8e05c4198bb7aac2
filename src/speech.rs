//! Text-to-speech functionality module.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SpeechError;

/// Voices text back to the user.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speaks `text`, returning once playback has finished.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Speaks through the platform's command-line synthesizer.
///
/// # Details
/// Uses the configured program when one is given (the text is passed as the
/// last argument), otherwise `say` on macOS, `System.Speech` via PowerShell on
/// Windows and `espeak` everywhere else.
pub struct SystemSpeaker {
    program: String,
    args: Vec<String>,
    // The Windows default speaks through an inline PowerShell script.
    text_in_script: bool,
}

impl SystemSpeaker {
    /// Creates a speaker; `command` may include arguments, e.g. `"espeak -s 150"`.
    pub fn new(command: Option<&str>) -> Self {
        let mut parts = command
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        let text_in_script = parts.is_empty() && cfg!(target_os = "windows");
        if parts.is_empty() {
            parts = platform_default().iter().map(|s| s.to_string()).collect();
        }
        let program = parts.remove(0);
        Self {
            program,
            args: parts,
            text_in_script,
        }
    }

    /// Name of the program this speaker runs.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[cfg(target_os = "macos")]
fn platform_default() -> &'static [&'static str] {
    &["say"]
}

#[cfg(target_os = "windows")]
fn platform_default() -> &'static [&'static str] {
    &["powershell", "-NoProfile", "-Command"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_default() -> &'static [&'static str] {
    &["espeak"]
}

#[async_trait]
impl Speaker for SystemSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let output = self.command_for(text).output().await.map_err(|source| {
            SpeechError::Launch {
                command: self.program.clone(),
                source,
            }
        })?;
        if !output.status.success() {
            return Err(SpeechError::Failed {
                command: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(())
    }
}

impl SystemSpeaker {
    fn command_for(&self, text: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.text_in_script {
            command.arg(format!(
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
                text.replace('\'', "''")
            ));
        } else {
            command.arg(text);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_command_is_split_into_program_and_args() {
        let speaker = SystemSpeaker::new(Some("espeak -s 150"));
        assert_eq!(speaker.program(), "espeak");
        assert_eq!(speaker.args, vec!["-s".to_string(), "150".to_string()]);
    }

    #[test]
    fn blank_command_uses_platform_default() {
        let speaker = SystemSpeaker::new(Some("   "));
        assert_eq!(speaker.program(), platform_default()[0]);
    }

    #[tokio::test]
    async fn speak_rejects_empty_text() {
        let speaker = SystemSpeaker::new(None);
        assert!(matches!(
            speaker.speak("   ").await,
            Err(SpeechError::EmptyText)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn speak_succeeds_with_text() {
        let speaker = SystemSpeaker::new(Some("true"));
        assert!(speaker.speak("Hello test").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn speak_reports_failing_command() {
        let speaker = SystemSpeaker::new(Some("false"));
        assert!(matches!(
            speaker.speak("failure case").await,
            Err(SpeechError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn speak_reports_missing_program() {
        let speaker = SystemSpeaker::new(Some("vocalis-no-such-tts-binary"));
        assert!(matches!(
            speaker.speak("hello").await,
            Err(SpeechError::Launch { .. })
        ));
    }
}
