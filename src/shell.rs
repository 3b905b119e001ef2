//! Interactive terminal front end over a [`Session`].
//!
//! Plain text submits the situation (compose view) or refines the displayed
//! message (result view). Lines starting with `:` are commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::concurrency::InFlightGate;
use crate::gemini::GenerativeBackend;
use crate::session::{ListenOutcome, Session, View};
use crate::share::{self, ShareOutcome, COPIED_INSTRUCTION};
use crate::types::{
    GeneratedContent, GenerationRequest, LanguageOption, RecipientType, ToneType, VoiceOption,
};

const HELP: &str = "\
Compose:  type what you want to say, then press Enter
          :recipient <name>  :tone <name>  :voice <name>  :language <name>  :form
Result:   type an instruction to refine the message
          :listen  :stop  :copy  :share  :export [dir]  :sources  :edit  :new
Always:   :dismiss  :help  :quit";

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    Recipient(RecipientType),
    Tone(ToneType),
    Voice(VoiceOption),
    Language(LanguageOption),
    Form,
    Listen,
    Stop,
    Copy,
    Share,
    Export(Option<PathBuf>),
    Sources,
    Edit,
    New,
    Dismiss,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Text(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "recipient" => Command::Recipient(choice(arg)?),
        "tone" => Command::Tone(choice(arg)?),
        "voice" => Command::Voice(choice(arg)?),
        "language" | "lang" => Command::Language(choice(arg)?),
        "form" => Command::Form,
        "listen" | "l" => Command::Listen,
        "stop" => Command::Stop,
        "copy" => Command::Copy,
        "share" => Command::Share,
        "export" => Command::Export((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "sources" => Command::Sources,
        "edit" => Command::Edit,
        "new" => Command::New,
        "dismiss" => Command::Dismiss,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command :{other} (try :help)")),
    };
    Ok(Some(command))
}

fn choice<T: ValueEnum>(arg: &str) -> Result<T, String> {
    if arg.is_empty() {
        let names: Vec<String> = T::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        return Err(format!("choose one of: {}", names.join(", ")));
    }
    T::from_str(arg, true)
}

/// Form settings carried between submissions.
#[derive(Debug, Clone, Default)]
struct Form {
    recipient: RecipientType,
    tone: ToneType,
    voice: VoiceOption,
    language: LanguageOption,
}

impl Form {
    fn from_request(request: &GenerationRequest) -> Self {
        Self {
            recipient: request.recipient,
            tone: request.tone,
            voice: request.voice,
            language: request.language,
        }
    }

    fn request(&self, input: &str) -> GenerationRequest {
        GenerationRequest {
            user_input: input.to_string(),
            recipient: self.recipient,
            tone: self.tone,
            voice: self.voice,
            language: self.language,
        }
    }

    /// Form settings and raw situation text to prefill from `draft`.
    fn prefill(draft: &GenerationRequest) -> (Self, String) {
        (Self::from_request(draft), draft.user_input.clone())
    }

    fn print(&self) {
        println!(
            "To: {} | Tone: {} | Voice: {} | Language: {}",
            self.recipient, self.tone, self.voice, self.language
        );
    }
}

/// Run the interactive loop until `:quit` or end of input.
pub async fn run<B: GenerativeBackend>(
    session: &mut Session<B>,
    export_dir: PathBuf,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut form = Form::default();
    let mut initial: Option<String> = None;

    println!("Describe the situation and press Enter. :help lists commands.");
    form.print();

    loop {
        session.poll_playback();
        let prompt = match session.view() {
            View::Compose { .. } => "compose> ",
            View::Result(_) => "refine> ",
        };

        let read = match initial.take() {
            Some(text) => editor.readline_with_initial(prompt, (text.as_str(), "")),
            None => editor.readline(prompt),
        };
        let line = match read {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        editor.add_history_entry(line.as_str())?;
        debug!(?command, "shell command");

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Dismiss => session.dismiss_error(),
            Command::Recipient(r) => {
                form.recipient = r;
                form.print();
            }
            Command::Tone(t) => {
                form.tone = t;
                form.print();
            }
            Command::Voice(v) => {
                form.voice = v;
                form.print();
            }
            Command::Language(l) => {
                form.language = l;
                form.print();
            }
            Command::Form => form.print(),
            Command::Text(text) => {
                let gate = session.gate();
                let composing = matches!(session.view(), View::Compose { .. });
                let outcome = if composing {
                    let request = form.request(&text);
                    with_spinner(gate, session.submit(request))
                        .await
                        .map(|()| true)
                } else {
                    with_spinner(gate, session.refine(&text)).await
                };
                match outcome {
                    Ok(true) => {
                        if let Some(content) = session.content() {
                            print_content(content);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            Command::Listen => {
                let gate = session.gate();
                match with_spinner(gate, session.listen()).await {
                    Ok(ListenOutcome::Started { duration_ms }) => {
                        println!("Playing ({:.1}s). :listen again to stop.", duration_ms / 1000.0)
                    }
                    Ok(ListenOutcome::Stopped) => println!("Stopped."),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Command::Stop => session.stop(),
            Command::Copy => match session.content() {
                Some(content) => {
                    share::copy_to_clipboard(&content.message, &mut std::io::stdout())?;
                    println!("Message copied.");
                }
                None => eprintln!("Generate a message first."),
            },
            Command::Share => match session.content() {
                Some(content) => {
                    let mut stdout = std::io::stdout();
                    match share::share_message(&content.message, &mut stdout)? {
                        ShareOutcome::Opened(link) => println!("Opened {link}"),
                        ShareOutcome::Copied => println!("{COPIED_INSTRUCTION}"),
                    }
                }
                None => eprintln!("Generate a message first."),
            },
            Command::Export(dir) => {
                let dir = dir.unwrap_or_else(|| export_dir.clone());
                match session.export(&dir) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Command::Sources => match session.content() {
                Some(content) => print_sources(content),
                None => eprintln!("Generate a message first."),
            },
            Command::Edit => {
                session.edit();
                if let Some(draft) = session.draft() {
                    let (prefilled, text) = Form::prefill(draft);
                    form = prefilled;
                    initial = Some(text);
                }
                form.print();
            }
            Command::New => {
                session.reset();
                form = Form::default();
                form.print();
            }
        }
    }

    session.stop();
    Ok(())
}

async fn with_spinner<F: Future>(gate: InFlightGate, fut: F) -> F::Output {
    let spinner = tokio::spawn(async move {
        let mut frame = 0;
        loop {
            tokio::time::sleep(Duration::from_millis(120)).await;
            if let Some(task) = gate.current() {
                eprint!("\r\x1b[K{} {task}", SPINNER[frame % SPINNER.len()]);
                frame += 1;
            }
        }
    });
    let output = fut.await;
    spinner.abort();
    eprint!("\r\x1b[K");
    output
}

pub fn print_content(content: &GeneratedContent) {
    println!();
    println!("{}", content.message);
    println!();
    print_sources(content);
}

fn print_sources(content: &GeneratedContent) {
    if content.sources.is_empty() {
        return;
    }
    println!("Sources:");
    for source in &content.sources {
        println!("  - {} <{}>", source.title, source.uri);
    }
}
