use clap::{Args, Parser, Subcommand};
use docgen::{
    Config, ConversationController, ConversationTurn, DocumentType, FeedbackRequest,
    FormController, HttpTransport, Role, SendOutcome, SubmitOutcome, ROUTES,
};
use indoc::formatdoc;
use itertools::Itertools;
use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate SOPs and Batch Records from the command line")]
struct Cli {
    /// Origin of the document service (overrides DOCGEN_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a single document
    Generate(GenerateArgs),
    /// Rate a previously generated document
    Feedback(FeedbackArgs),
    /// Show statistics about generated documents and feedback
    Stats,
    /// Ask the service to retrain on collected feedback
    Train,
    /// Interactive conversation
    Chat {
        #[arg(long = "type", default_value = "sop")]
        document_type: DocumentType,
    },
    /// List the service routes this client calls
    Routes,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    steps: String,
    #[arg(long)]
    roles: String,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long = "type", default_value = "sop")]
    document_type: DocumentType,
    /// Rate the generated document right away (1-5)
    #[arg(long)]
    rate: Option<u8>,
    #[arg(long, requires = "rate")]
    comment: Option<String>,
}

#[derive(Args, Debug)]
struct FeedbackArgs {
    #[arg(long)]
    doc_id: String,
    #[arg(long)]
    score: u8,
    #[arg(long)]
    text: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).into_diagnostic()?;

    let mut config = Config::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }

    match cli.command {
        Command::Generate(args) => generate(&config, args).await,
        Command::Feedback(args) => feedback(&config, args).await,
        Command::Stats => stats(&config).await,
        Command::Train => train(&config).await,
        Command::Chat { document_type } => chat(&config, document_type).await,
        Command::Routes => {
            for route in ROUTES {
                println!("{:<6} {:<24} {}", route.method.to_uppercase(), route.path, route.name);
            }
            Ok(())
        }
    }
}

async fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let form = FormController::new(config.adapter()?);
    form.set_steps(args.steps);
    form.set_roles(args.roles);
    form.set_notes(args.notes.unwrap_or_default());
    form.set_document_type(args.document_type);

    match form.on_submit().await {
        SubmitOutcome::Shown { doc_id } => {
            if let Some(resp) = form.response() {
                println!("{}", resp.content);
                if let Some(doc) = resp.word_document.filter(|d| d.available) {
                    println!("\nWord document: {}", form.adapter().download_url(&doc));
                }
            }
            println!("\ndoc id: {doc_id}");
        }
        SubmitOutcome::Invalid(err) => return Err(err).into_diagnostic(),
        SubmitOutcome::Errored(err) => return Err(err.into()),
        SubmitOutcome::Busy | SubmitOutcome::Stale => {
            return Err(miette::miette!("submission was interrupted"))
        }
    }

    if let Some(score) = args.rate {
        form.select_rating(score)?;
        if let Some(comment) = args.comment {
            form.set_feedback_text(comment)?;
        }
        form.submit_feedback().await?;
        println!("Thank you for your feedback!");
    }

    Ok(())
}

async fn feedback(config: &Config, args: FeedbackArgs) -> Result<()> {
    let adapter = config.adapter()?;
    let request = FeedbackRequest::new(args.doc_id, args.score, args.text).into_diagnostic()?;

    adapter.submit_feedback(&request).await?;
    println!("Feedback recorded for {}", request.doc_id());
    Ok(())
}

async fn stats(config: &Config) -> Result<()> {
    let stats = config.adapter()?.model_stats().await?;

    print!(
        "{}",
        formatdoc!(
            "
            Documents:        {total} ({rated} with feedback)
            Average score:    {average:.2}
            SOPs:             {sops} ({sops_rated} with feedback)
            Batch records:    {batches} ({batches_rated} with feedback)
            ",
            total = stats.total_documents,
            rated = stats.documents_with_feedback,
            average = stats.average_feedback_score,
            sops = stats.sops.total,
            sops_rated = stats.sops.with_feedback,
            batches = stats.batch_records.total,
            batches_rated = stats.batch_records.with_feedback,
        )
    );
    Ok(())
}

async fn train(config: &Config) -> Result<()> {
    let ack = config.adapter()?.train_model().await?;
    println!(
        "{}",
        ack.message
            .unwrap_or_else(|| "Training started".to_owned())
    );
    Ok(())
}

fn render(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut lines = vec![format!(
        "[{}] {speaker}: {}",
        turn.timestamp.format("%H:%M"),
        turn.content
    )];
    if let Some(doc) = &turn.word_document {
        lines.push(format!("  word document: {} ({})", doc.filename, doc.download_url));
    }
    if turn.feedback_eligible {
        lines.push("  rate this document with /rate <1-5> [comment]".to_owned());
    }
    lines.into_iter().join("\n")
}

async fn chat(config: &Config, document_type: DocumentType) -> Result<()> {
    let ctl = ConversationController::new(config.adapter()?).with_welcome();
    ctl.set_document_type(document_type);

    let mut shown = 0;
    let mut print_new = |ctl: &ConversationController<HttpTransport>| {
        let turns = ctl.snapshot();
        for turn in turns.iter().skip(shown).filter(|t| t.role == Role::Assistant) {
            println!("{}", render(turn));
        }
        shown = turns.len();
    };
    print_new(&ctl);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let line = line.trim();

        if line == "/quit" {
            break;
        } else if let Some(kind) = line.strip_prefix("/type ") {
            match kind.parse::<DocumentType>() {
                Ok(kind) => {
                    ctl.set_document_type(kind);
                    println!("document type: {}", kind.label());
                }
                Err(err) => eprintln!("{err}"),
            }
        } else if let Some(rest) = line.strip_prefix("/rate") {
            let Some(doc_id) = ctl.latest_rateable() else {
                eprintln!("nothing to rate yet");
                continue;
            };
            let (score, comment) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
            let Ok(score) = score.parse::<u8>() else {
                eprintln!("usage: /rate <1-5> [comment]");
                continue;
            };
            let drafted = ctl
                .set_feedback_rating(&doc_id, score)
                .and_then(|()| ctl.set_feedback_text(&doc_id, comment));
            let submitted = match drafted {
                Ok(()) => ctl.submit_feedback(&doc_id).await,
                Err(err) => Err(err),
            };
            if let Err(err) = submitted {
                eprintln!("{:?}", miette::Report::new(err));
            }
        } else {
            ctl.set_input(line);
            if let SendOutcome::Failed(err) = ctl.send_message().await {
                tracing::debug!(error = %err, "generation failed");
            }
        }

        print_new(&ctl);
    }

    Ok(())
}
