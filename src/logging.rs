//! Transcript logging to a user-chosen file.
//!
//! Enabled at startup with `-l/--log` or at runtime with `/log <file>`;
//! `/log` with no argument pauses and resumes. Only conversation messages
//! are written — app notices stay on screen.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::core::message::Message;

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Self {
        let is_active = log_file.is_some();
        LoggingState {
            file_path: log_file,
            is_active,
        }
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;
        self.file_path = Some(path.clone());
        self.is_active = true;
        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {path}"))
                } else {
                    Ok(format!("Logging paused (file: {path})"))
                }
            }
            None => Err("No log file specified. Use /log <filename> first.".into()),
        }
    }

    /// Append one conversation message. App-authored messages are skipped.
    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };
        if message.role.is_app() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        if message.is_user() {
            writeln!(file, "You: {}", message.content)?;
        } else {
            for line in message.content.lines() {
                writeln!(file, "{line}")?;
            }
        }
        writeln!(file)?;
        file.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), active) => {
                let name = Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy();
                if active {
                    format!("logging {name}")
                } else {
                    format!("logging paused ({name})")
                }
            }
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_path(dir: &tempfile::TempDir) -> String {
        dir.path().join("chat.log").to_string_lossy().into_owned()
    }

    #[test]
    fn inactive_logging_writes_nothing() {
        let logging = LoggingState::new(None);
        logging
            .log_message(&Message::user("hello"))
            .expect("no-op succeeds");
        assert_eq!(logging.status_string(), "disabled");
    }

    #[test]
    fn messages_are_appended_with_role_prefixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = log_path(&dir);
        let logging = LoggingState::new(Some(path.clone()));

        logging.log_message(&Message::user("hi")).expect("log");
        logging
            .log_message(&Message::assistant("hello\nthere"))
            .expect("log");
        logging
            .log_message(&Message::app_info("not logged"))
            .expect("log");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "You: hi\n\nhello\nthere\n\n");
    }

    #[test]
    fn toggle_pauses_and_resumes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = log_path(&dir);
        let mut logging = LoggingState::new(Some(path.clone()));

        let paused = logging.toggle_logging().expect("toggle");
        assert!(paused.contains("paused"));
        logging.log_message(&Message::user("hidden")).expect("log");
        assert!(!std::path::Path::new(&path).exists());

        let resumed = logging.toggle_logging().expect("toggle");
        assert!(resumed.contains("resumed"));
    }

    #[test]
    fn toggle_without_file_is_an_error() {
        let mut logging = LoggingState::new(None);
        assert!(logging.toggle_logging().is_err());
    }

    #[test]
    fn set_log_file_enables_logging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = log_path(&dir);
        let mut logging = LoggingState::new(None);
        let notice = logging.set_log_file(path.clone()).expect("set");
        assert!(notice.contains("Logging enabled"));
        assert!(logging.status_string().starts_with("logging chat.log"));
    }
}
