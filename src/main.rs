use anyhow::Context;
use clap::Parser;

use arlens::analysis::AccountsReport;
use arlens::config::{self, Cli, Command, OutputFormat};
use arlens::{faker, filter, logging, reader, reporter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // The only wall-clock read; everything downstream takes the date explicitly.
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Command::Analyze(args) => {
            let as_of = config::date_or(args.as_of.as_deref(), today)?;
            let predicates = args.account_filter()?;

            let dataset = reader::load_dataset(&args.file)
                .await
                .with_context(|| format!("Could not load {}", args.file.display()))?;
            let view = filter::filter(&dataset.accounts, &predicates);
            let report = AccountsReport::build(&view, &args.analysis_options(as_of));

            match args.format {
                OutputFormat::Table => {
                    reporter::print_dataset_notes(&dataset);
                    reporter::print_report(&report, args.top);
                }
                OutputFormat::Json => println!("{}", reporter::render_json(&report)?),
            }
        }
        Command::Generate(args) => {
            let as_of = config::date_or(args.as_of.as_deref(), today)?;
            faker::write_fake_accounts_csv(&args.path, args.count, as_of)?;
            println!("Wrote {} accounts to {}", args.count, args.path.display());
        }
    }

    Ok(())
}
