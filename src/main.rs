//! Premier League Score Prediction CLI
//!
//! Fetches season results, trains a goal regressor and predicts fixtures.

use clap::{Parser, Subcommand};
use football::model::ModelKind;
use football::predict::{FormPolicy, OutputFormat};
use football::{Config, Result};

#[derive(Parser)]
#[command(name = "football")]
#[command(about = "Premier League score prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train a model and save it with its preprocessor
    Train {
        /// Model family (defaults to the configured one)
        #[arg(long, value_enum)]
        model: Option<ModelKind>,
        /// Override number of MLP epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Predict a fixture from saved artifacts
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        #[arg(long, value_enum)]
        model: Option<ModelKind>,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Fixture form source (defaults to the configured one for the model)
        #[arg(long, value_enum)]
        form: Option<FormPolicy>,
    },
    /// Load, train, evaluate, save and predict in one go
    Run {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        #[arg(long, value_enum)]
        model: Option<ModelKind>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        #[arg(long, value_enum)]
        form: Option<FormPolicy>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Download every configured season into the cache
    Sync {
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
        /// Download again even when a cached copy exists
        #[arg(long)]
        refresh: bool,
    },
    /// Show a summary of the cached match table
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync { offline, refresh } => commands::data_sync(&config, offline, refresh),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { model, epochs } => commands::train(&config, model, epochs),
        Commands::Predict {
            home,
            away,
            model,
            format,
            form,
        } => commands::predict(&config, &home, &away, model, format, form),
        Commands::Run {
            home,
            away,
            model,
            format,
            form,
        } => commands::run(&config, &home, &away, model, format, form),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use football::data::{MatchTable, SeasonLoader};
    use football::model::ScoreModel;
    use football::predict::inference::render_prediction;
    use football::predict::Predictor;
    use football::training::{load_artifacts, prepare_table, Evaluation, Trainer};
    use football::FootballError;
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.cache_dir)?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!(
            "Created {}/ and {}/ directories",
            config.data.cache_dir, config.data.model_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'football data sync' to fetch season files");
        println!("  3. Run 'football train' to train the model");
        println!("  4. Run 'football predict \"Arsenal\" \"Chelsea\"' to make predictions");

        Ok(())
    }

    fn load_table(config: &Config, offline: bool) -> Result<MatchTable> {
        let loader = SeasonLoader::new()?
            .with_cache(&config.data.cache_dir)
            .offline_only(offline);
        let table = loader.load_all(&config.data.seasons)?;
        Ok(prepare_table(table, &config.features))
    }

    pub fn data_sync(config: &Config, offline: bool, refresh: bool) -> Result<()> {
        let loader = SeasonLoader::new()?
            .with_cache(&config.data.cache_dir)
            .offline_only(offline)
            .refresh(refresh);

        if offline {
            println!("Offline mode: using cached files only");
        }

        let table = loader.load_all(&config.data.seasons)?;
        for season in table.stats().seasons {
            let count = table.records().iter().filter(|m| m.season == season).count();
            println!("  {:<8} {} matches", season, count);
        }
        println!(
            "Cached {} matches from {} seasons in {}",
            table.len(),
            config.data.seasons.len(),
            config.data.cache_dir
        );

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let table = load_table(config, true)?;
        let stats = table.stats();

        println!("Data Status");
        println!("───────────────────────────────");
        println!("  Cache:    {}", config.data.cache_dir);
        println!("  Seasons:  {}", stats.seasons.join(", "));
        println!("  Teams:    {}", stats.team_count);
        println!("  Matches:  {}", stats.match_count);
        println!(
            "  Results:  {} home wins, {} draws, {} away wins",
            stats.home_wins, stats.draws, stats.away_wins
        );
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest, latest);
        }
        println!(
            "  Order:    {}",
            if table.is_chronological() {
                "chronological"
            } else {
                "source order (not chronological)"
            }
        );

        Ok(())
    }

    fn print_evaluation(kind: ModelKind, evaluation: &Evaluation) {
        println!("\n{} evaluation", kind);
        println!("───────────────────────────────");
        println!("{}", evaluation);
    }

    /// Fit, evaluate and save; returns the table and the fitted parts
    fn fit_and_save(
        config: &Config,
        kind: ModelKind,
    ) -> Result<(MatchTable, football::features::Preprocessor, Box<dyn ScoreModel>)> {
        let table = load_table(config, false)?;
        println!("Loaded {} matches", table.len());

        let pipeline = Trainer::new(config).train(&table, kind)?;
        print_evaluation(kind, &pipeline.evaluation);
        if let Some((epoch, loss)) = pipeline.model.training_history().and_then(|h| h.best()) {
            println!("Best validation loss: {:.4} (epoch {})", loss, epoch + 1);
        }

        let model_dir = Path::new(&config.data.model_dir);
        pipeline.save(model_dir)?;
        println!("\nSaved {} model to {}", kind, model_dir.display());

        Ok((table, pipeline.preprocessor, pipeline.model))
    }

    pub fn train(config: &Config, model: Option<ModelKind>, epochs: Option<usize>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.mlp.epochs = e;
        }
        let kind = model.unwrap_or(config.model.kind);

        println!("Training {} model...", kind);
        fit_and_save(&config, kind)?;
        println!("\nTraining complete!");

        Ok(())
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        model: Option<ModelKind>,
        format: OutputFormat,
        form: Option<FormPolicy>,
    ) -> Result<()> {
        let kind = model.unwrap_or(config.model.kind);
        let (preprocessor, model) =
            load_artifacts(kind, config, Path::new(&config.data.model_dir))?;
        let table = load_table(config, false)?;

        let predictor = with_form(Predictor::new(preprocessor, model, table, config), form);
        show_prediction(&predictor, home, away, format)
    }

    pub fn run(
        config: &Config,
        home: &str,
        away: &str,
        model: Option<ModelKind>,
        format: OutputFormat,
        form: Option<FormPolicy>,
    ) -> Result<()> {
        let kind = model.unwrap_or(config.model.kind);
        let (table, preprocessor, model) = fit_and_save(config, kind)?;

        println!();
        let predictor = with_form(Predictor::new(preprocessor, model, table, config), form);
        show_prediction(&predictor, home, away, format)
    }

    fn with_form(predictor: Predictor, form: Option<FormPolicy>) -> Predictor {
        match form {
            Some(policy) => predictor.with_policy(policy),
            None => predictor,
        }
    }

    /// Print the prediction; an unknown team is reported without failing
    fn show_prediction(
        predictor: &Predictor,
        home: &str,
        away: &str,
        format: OutputFormat,
    ) -> Result<()> {
        match predictor.predict(home, away) {
            Ok(prediction) => {
                println!("{}", render_prediction(&prediction, format)?);
                Ok(())
            }
            Err(e @ FootballError::TeamNotFound(_)) => {
                println!("Error: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
