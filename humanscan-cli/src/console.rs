// Humanscan Interactive Console
// One detection session per console: pick an image, tune the threshold, detect

use anyhow::Result;
use humanscan_client::{
    Completion, DetectError, DetectionService, DetectionSession, ErrorClass, SelectedImage,
};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

pub struct InteractiveConsole<S: DetectionService> {
    session: DetectionSession<S>,
    history: Vec<String>,
}

impl<S: DetectionService> InteractiveConsole<S> {
    pub fn new(session: DetectionSession<S>) -> Self {
        Self {
            session,
            history: Vec::new(),
        }
    }

    /// Start the interactive console
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();
        self.print_help();

        let stdin = io::stdin();
        let mut stdin = BufReader::new(stdin.lock());

        loop {
            print!("{}> ", self.prompt());
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }

            let line = line.trim().to_string();

            if line.is_empty() {
                continue;
            }

            if !self.history.contains(&line) {
                self.history.push(line.clone());
            }

            match self.handle_command(&line).await {
                Ok(CommandResult::Continue) => continue,
                Ok(CommandResult::Exit) => break,
                Ok(CommandResult::Success(msg)) => {
                    if !msg.is_empty() {
                        println!("✅ {}", msg);
                    }
                }
                Ok(CommandResult::Notice(msg)) => {
                    println!("⚠️  {}", msg);
                }
                Ok(CommandResult::Error(msg)) => {
                    println!("❌ Error: {}", msg);
                }
                Ok(CommandResult::Output(output)) => {
                    println!("{}", output);
                }
                Err(e) => {
                    println!("❌ Error: {}", e);
                }
            }
        }

        println!("\n👋 Goodbye!");
        Ok(())
    }

    fn print_banner(&self) {
        println!("\n╔═══════════════════════════════════════════════════════════════╗");
        println!("║                   Humanscan Detection Console                 ║");
        println!("╚═══════════════════════════════════════════════════════════════╝");
        println!();
        println!("Detection service: {}", self.session.service().endpoint());
        println!("Type 'help' for available commands, 'exit' to quit");
        println!();
    }

    fn print_help(&self) {
        println!("📚 Available Commands:");
        println!("  help, ?             - Show this help message");
        println!("  exit, quit, q       - Exit the console");
        println!("  open <image>        - Select an image file");
        println!("  threshold [value]   - Set the confidence threshold (empty clears the field)");
        println!("  detect              - Send the selected image for detection");
        println!("  status              - Show the selected image and the last result");
        println!("  save <file.png>     - Write the annotated image to a file");
        println!("  history             - Show command history");
        println!();
    }

    fn prompt(&self) -> String {
        let field = self.session.threshold().text();
        if self.session.selected_image().is_some() {
            format!("humanscan[image, t={}]", field)
        } else {
            format!("humanscan[t={}]", field)
        }
    }

    async fn handle_command(&mut self, line: &str) -> Result<CommandResult> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (line.to_lowercase(), ""),
        };

        match command.as_str() {
            "exit" | "quit" | "q" => Ok(CommandResult::Exit),
            "help" | "?" => {
                self.print_help();
                Ok(CommandResult::Continue)
            }
            "clear" | "cls" => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
                Ok(CommandResult::Continue)
            }
            "open" | "select" => self.open_image(rest).await,
            "threshold" | "t" => Ok(self.set_threshold(rest)),
            "detect" => self.detect().await,
            "status" | "show" => Ok(CommandResult::Output(self.format_status())),
            "save" => {
                if rest.is_empty() {
                    return Ok(CommandResult::Error("Usage: save <file.png>".to_string()));
                }
                self.save_result(rest).await
            }
            "history" => {
                println!("📜 Command History:");
                for (i, cmd) in self.history.iter().enumerate() {
                    println!("  {}: {}", i + 1, cmd);
                }
                Ok(CommandResult::Continue)
            }
            _ => Ok(CommandResult::Error(format!(
                "Unknown command: {}. Type 'help' for available commands.",
                command
            ))),
        }
    }

    async fn open_image(&mut self, arg: &str) -> Result<CommandResult> {
        // A pasted data URI is taken as-is
        if arg.starts_with("data:") {
            return Ok(match SelectedImage::parse(arg) {
                Ok(image) => {
                    let msg = format!("Selected pasted {} image", image.mime());
                    self.session.set_image(image);
                    CommandResult::Success(msg)
                }
                Err(e) => report(e),
            });
        }

        // No path is a closed picker: nothing changes, nothing is reported
        let path = if arg.is_empty() { None } else { Some(Path::new(arg)) };

        match self.session.select_image(path).await {
            Ok(true) => {
                let image = self.session.selected_image();
                let mime = image.map(|i| i.mime().to_string()).unwrap_or_default();
                let name = path.map(|p| p.display().to_string()).unwrap_or_default();
                Ok(CommandResult::Success(format!("Selected {} ({})", name, mime)))
            }
            Ok(false) => Ok(CommandResult::Continue),
            Err(e) => Ok(report(e)),
        }
    }

    fn set_threshold(&mut self, raw: &str) -> CommandResult {
        if !self.session.edit_threshold(raw).is_accepted() {
            return CommandResult::Continue;
        }
        CommandResult::Success(format!(
            "Confidence threshold: {}",
            self.session.threshold().text()
        ))
    }

    async fn detect(&mut self) -> Result<CommandResult> {
        match self.session.dispatch().await {
            Ok(Completion::Applied(result)) => Ok(CommandResult::Output(format!(
                "🧍 Number of people in the image: {}",
                result.person_count
            ))),
            // Already on the diagnostic log
            Ok(Completion::Failed(_)) | Ok(Completion::Stale) => Ok(CommandResult::Continue),
            Err(e) => Ok(report(e)),
        }
    }

    async fn save_result(&self, path: &str) -> Result<CommandResult> {
        let result = match self.session.result() {
            Some(r) => r,
            None => return Ok(CommandResult::Error("No detection result yet".to_string())),
        };

        let png = result.annotated_png()?;
        tokio::fs::write(path, &png).await?;
        Ok(CommandResult::Success(format!("Saved {} bytes to {}", png.len(), path)))
    }

    fn format_status(&self) -> String {
        let view = self.session.view();
        let mut output = String::new();

        output.push_str("🖼️  Upload Image\n");
        match self.session.selected_image() {
            Some(image) => output.push_str(&format!(
                "   Preview:    {} ({} base64 chars)\n",
                image.mime(),
                image.payload_len()
            )),
            None => output.push_str("   Preview:    (none)\n"),
        }
        output.push_str(&format!(
            "   Threshold:  {} ({})\n",
            view.threshold_text,
            self.session.threshold().policy().as_str()
        ));
        output.push_str(&format!("   State:      {}\n", view.state.as_str()));

        output.push_str("📊 Result\n");
        match &view.annotated_image {
            Some(image) => output.push_str(&format!("   Image:      {} chars\n", image.len())),
            None => output.push_str("   Image:      (none)\n"),
        }
        let count = view
            .person_count
            .map(|n| n.to_string())
            .unwrap_or_default();
        output.push_str(&format!("   Number of people in the image: {}", count));

        output
    }
}

/// What the user sees for a failed command, by error class
fn report(err: DetectError) -> CommandResult {
    match err.class() {
        ErrorClass::UserPrecondition => CommandResult::Notice(err.to_string()),
        ErrorClass::Transport | ErrorClass::InputValidation => CommandResult::Continue,
        ErrorClass::Local => CommandResult::Error(err.to_string()),
    }
}

#[derive(Debug, PartialEq)]
enum CommandResult {
    Continue,
    Exit,
    Success(String),
    Notice(String),
    Error(String),
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use humanscan_client::{ClientConfig, DetectionRequest, DetectionResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingService {
        calls: AtomicUsize,
        num_humans: u64,
    }

    #[async_trait]
    impl DetectionService for CountingService {
        fn endpoint(&self) -> &str {
            "test://detect"
        }

        async fn detect(
            &self,
            _request: &DetectionRequest,
        ) -> humanscan_client::Result<DetectionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DetectionResponse {
                b64image: "QUJD".to_string(),
                num_humans: self.num_humans,
            })
        }
    }

    struct UnreachableService;

    #[async_trait]
    impl DetectionService for UnreachableService {
        fn endpoint(&self) -> &str {
            "test://down"
        }

        async fn detect(
            &self,
            _request: &DetectionRequest,
        ) -> humanscan_client::Result<DetectionResponse> {
            Err(DetectError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn console(num_humans: u64) -> InteractiveConsole<CountingService> {
        let service = CountingService {
            calls: AtomicUsize::new(0),
            num_humans,
        };
        InteractiveConsole::new(DetectionSession::new(service, ClientConfig::default()))
    }

    #[tokio::test]
    async fn test_detect_without_image_shows_notice() {
        let mut console = console(1);
        let result = console.handle_command("detect").await.unwrap();
        assert_eq!(result, CommandResult::Notice("Please select image first!".to_string()));
        assert_eq!(console.session.service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_without_path_is_silent() {
        let mut console = console(1);
        let result = console.handle_command("open").await.unwrap();
        assert_eq!(result, CommandResult::Continue);
        assert!(console.session.selected_image().is_none());
    }

    #[tokio::test]
    async fn test_threshold_rejected_is_silent() {
        let mut console = console(1);
        assert_eq!(
            console.handle_command("threshold abc").await.unwrap(),
            CommandResult::Continue
        );
        assert_eq!(console.session.threshold().value(), 0.5);

        let result = console.handle_command("threshold 0.3").await.unwrap();
        assert!(matches!(result, CommandResult::Success(_)));
        assert_eq!(console.session.threshold().value(), 0.3);

        console.handle_command("threshold").await.unwrap();
        assert!(console.session.threshold().is_blank());
    }

    #[tokio::test]
    async fn test_detect_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("people.png");
        std::fs::write(&image_path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let mut console = console(3);
        let opened = console
            .handle_command(&format!("open {}", image_path.display()))
            .await
            .unwrap();
        assert!(matches!(opened, CommandResult::Success(_)));

        let detected = console.handle_command("detect").await.unwrap();
        assert_eq!(
            detected,
            CommandResult::Output("🧍 Number of people in the image: 3".to_string())
        );

        let out_path = dir.path().join("result.png");
        let saved = console
            .handle_command(&format!("save {}", out_path.display()))
            .await
            .unwrap();
        assert!(matches!(saved, CommandResult::Success(_)));
        assert_eq!(std::fs::read(&out_path).unwrap(), b"ABC");

        let status = console.format_status();
        assert!(status.contains("image/png"));
        assert!(status.contains("Number of people in the image: 3"));
    }

    #[tokio::test]
    async fn test_save_without_result() {
        let console_result = console(1).handle_command("save out.png").await.unwrap();
        assert!(matches!(console_result, CommandResult::Error(_)));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let result = console(1).handle_command("frobnicate").await.unwrap();
        assert!(matches!(result, CommandResult::Error(msg) if msg.contains("Unknown command")));
    }

    #[tokio::test]
    async fn test_transport_failure_is_silent() {
        let session = DetectionSession::new(UnreachableService, ClientConfig::default());
        let mut console = InteractiveConsole::new(session);
        console
            .handle_command("open data:image/png;base64,iVBORw0KGgo=")
            .await
            .unwrap();

        let result = console.handle_command("detect").await.unwrap();
        assert_eq!(result, CommandResult::Continue);
        assert_eq!(console.session.view().failure_count, 1);
    }

    #[tokio::test]
    async fn test_open_pasted_data_uri() {
        let mut console = console(2);
        let result = console
            .handle_command("open data:image/gif;base64,R0lGODlh")
            .await
            .unwrap();
        assert_eq!(result, CommandResult::Success("Selected pasted image/gif image".to_string()));
        assert_eq!(console.session.selected_image().unwrap().mime(), "image/gif");

        let rejected = console
            .handle_command("open data:text/plain;base64,aGk=")
            .await
            .unwrap();
        assert!(matches!(rejected, CommandResult::Error(_)));
        assert_eq!(console.session.selected_image().unwrap().mime(), "image/gif");
    }

    #[tokio::test]
    async fn test_open_missing_file_is_error() {
        let mut console = console(1);
        let result = console.handle_command("open /no/such/image.png").await.unwrap();
        assert!(matches!(result, CommandResult::Error(_)));
    }

    #[test]
    fn test_report_by_error_class() {
        assert_eq!(
            report(DetectError::NoImageSelected),
            CommandResult::Notice("Please select image first!".to_string())
        );
        assert_eq!(
            report(DetectError::InvalidResponse("bad".to_string())),
            CommandResult::Continue
        );
        assert_eq!(
            report(DetectError::InvalidThreshold("abc".to_string())),
            CommandResult::Continue
        );
        assert!(matches!(
            report(DetectError::ImageTooLarge { size: 2, limit: 1 }),
            CommandResult::Error(_)
        ));
    }

    #[test]
    fn test_status_shows_threshold_policy() {
        let status = console(1).format_status();
        assert!(status.contains("Threshold:  0.5 (permissive)"));
    }
}
