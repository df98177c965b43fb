use anyhow::{Context, Result};
use reqwest::Client;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{ApiKey, Config};
use crate::explain::{CompletionBackend, Explainer, Explanation, ProviderBackend};
use crate::render::{DEFAULT_FILE_NAME, PdfArtifact};

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Exit,
    Show,
    Pdf(Option<&'a str>),
    Explain(&'a str),
    Empty,
}

fn parse_command(input: &str) -> Command<'_> {
    let line = input.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }
    if line.eq_ignore_ascii_case("/show") {
        return Command::Show;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    if parts
        .next()
        .is_some_and(|head| head.eq_ignore_ascii_case("/pdf"))
    {
        let path = parts.next().map(str::trim).filter(|rest| !rest.is_empty());
        return Command::Pdf(path);
    }
    Command::Explain(line)
}

/// One user's interaction state: the most recent explanation, if any.
/// Generating an explanation and generating a PDF are separate actions, and
/// either can be repeated.
pub struct Session<'a, B = ProviderBackend> {
    explainer: Explainer<'a, B>,
    default_pdf_path: PathBuf,
    current: Option<Explanation>,
}

impl<'a> Session<'a, ProviderBackend> {
    pub fn new(client: &'a Client, cfg: &'a Config, api_key: ApiKey) -> Self {
        Self::with_explainer(Explainer::new(client, cfg, api_key), cfg.pdf_output_path.clone())
    }
}

impl<'a, B> Session<'a, B>
where
    B: CompletionBackend,
{
    pub fn with_explainer(explainer: Explainer<'a, B>, default_pdf_path: PathBuf) -> Self {
        Self {
            explainer,
            default_pdf_path,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Explanation> {
        self.current.as_ref()
    }

    /// Runs the "generate explanation" action. On failure the previous
    /// explanation stays available.
    pub async fn generate_explanation(&mut self, topic: &str) -> Result<&Explanation> {
        let explanation = self.explainer.explain(topic).await?;
        Ok(self.current.insert(explanation))
    }

    /// Runs the "generate PDF" action against the current explanation.
    pub fn generate_pdf(&self, path: Option<&Path>) -> Result<PathBuf> {
        let explanation = self
            .current
            .as_ref()
            .context("No explanation yet. Ask a question first.")?;
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_pdf_path.clone());
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();

        let artifact = PdfArtifact::render(&explanation.text, file_name)?;
        artifact.write_to(&path)?;
        Ok(path)
    }
}

pub async fn run_repl<B>(session: &mut Session<'_, B>, model: &str) -> Result<()>
where
    B: CompletionBackend,
{
    let stdin = io::stdin();
    let mut input = stdin.lock();

    println!("Finance & AI Knowledge Hub");
    println!("model: {}", model);
    println!(
        "type a question to get an explanation, '/pdf [path]' to save it as PDF, \
         '/show' to print it again, or 'exit' to quit"
    );

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read stdin")?;
        if read == 0 {
            break;
        }

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Exit => break,
            Command::Show => match session.current() {
                Some(explanation) => println!("{}\n", explanation.text.trim()),
                None => println!("(no explanation yet)\n"),
            },
            Command::Pdf(path) => match session.generate_pdf(path.map(Path::new)) {
                Ok(path) => println!(
                    "PDF ready for download: {} ({})\n",
                    path.display(),
                    crate::render::PDF_MIME_TYPE
                ),
                Err(err) => {
                    warn!(error = %err, "pdf generation failed");
                    println!("Error generating PDF: {err:#}\n");
                }
            },
            Command::Explain(topic) => match session.generate_explanation(topic).await {
                Ok(explanation) => println!("{}\n", explanation.text.trim()),
                Err(err) => {
                    warn!(error = %err, "explanation request failed");
                    println!("Error: {err:#}\n");
                }
            },
        }
    }

    info!("interactive session finished");
    Ok(())
}
