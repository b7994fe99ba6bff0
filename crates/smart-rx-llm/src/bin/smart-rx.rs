//! Command-line front end for the prescription assistant.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smart_rx_core::analysis::analyze_history;
use smart_rx_core::db::Database;
use smart_rx_core::models::{Patient, PatientUpdate, PrescriptionStatus};
use smart_rx_core::store::PrescriptionStore;
use smart_rx_llm::{
    ChatAssistant, GeminiClient, GenerativeTextService, PrescriptionOrchestrator,
    PrescriptionRequest, SmartRxConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smart-rx")]
#[command(about = "Draft, review and save prescriptions from the clinic store")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SMART_RX_CONFIG")]
    config: Option<PathBuf>,

    /// Override the database path from configuration
    #[arg(long)]
    database: Option<PathBuf>,

    /// Never call the generative service
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage patients
    #[command(subcommand)]
    Patient(PatientCommand),
    /// Show the history analysis for a patient
    History {
        patient_id: String,
    },
    /// Draft a prescription for a patient
    Draft {
        patient_id: String,
        /// Presenting symptom (repeatable)
        #[arg(short, long = "symptom", required = true)]
        symptoms: Vec<String>,
        /// Working diagnosis, if any
        #[arg(short, long)]
        diagnosis: Option<String>,
        #[arg(long, default_value = "")]
        doctor_id: String,
        #[arg(long, default_value = "")]
        doctor_name: String,
        /// Save the draft as an active prescription
        #[arg(long)]
        save: bool,
    },
    /// Approve a pending prescription
    Approve {
        prescription_id: String,
    },
    /// Mark an active prescription as completed
    Complete {
        prescription_id: String,
    },
    /// Cancel a pending or active prescription
    Cancel {
        prescription_id: String,
    },
    /// List prescriptions in one status across all patients
    Prescriptions {
        #[arg(short, long, value_parser = parse_status)]
        status: PrescriptionStatus,
    },
    /// Ask the clinical reference assistant a question
    Ask {
        question: String,
        /// Ground the question on this patient
        #[arg(short, long)]
        patient: Option<String>,
    },
}

#[derive(Subcommand)]
enum PatientCommand {
    /// Register a patient
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        age: Option<u32>,
        #[arg(short, long)]
        gender: Option<String>,
        /// Known allergy (repeatable)
        #[arg(long = "allergy")]
        allergies: Vec<String>,
    },
    /// Edit a patient; omitted options are left unchanged
    Update {
        patient_id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        age: Option<u32>,
        #[arg(short, long)]
        gender: Option<String>,
        /// Replace the allergy list (repeatable)
        #[arg(long = "allergy")]
        allergies: Option<Vec<String>>,
        /// Clear all recorded allergies
        #[arg(long, conflicts_with = "allergies")]
        no_allergies: bool,
        #[arg(long)]
        condition: Option<String>,
    },
    /// List patients, optionally filtered by name
    List {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SmartRxConfig::load(cli.config.as_deref()).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let db_path = cli.database.clone().unwrap_or_else(|| config.database_path.clone());
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let service = if cli.offline {
        None
    } else {
        build_service(&config)
    };

    match cli.command {
        Commands::Patient(PatientCommand::Add {
            name,
            age,
            gender,
            allergies,
        }) => {
            anyhow::ensure!(!name.trim().is_empty(), "patient name must not be blank");
            let mut patient = Patient::new(name.trim().to_string());
            patient.age = age;
            patient.gender = gender;
            patient.allergies = allergies;
            db.insert_patient(&patient).context("saving patient")?;
            println!("{}", patient.id);
        }
        Commands::Patient(PatientCommand::Update {
            patient_id,
            name,
            age,
            gender,
            allergies,
            no_allergies,
            condition,
        }) => {
            let update = PatientUpdate {
                name,
                age,
                gender,
                allergies: if no_allergies { Some(Vec::new()) } else { allergies },
                medical_history: None,
                condition,
            };
            anyhow::ensure!(!update.is_empty(), "nothing to update");
            let patient = db
                .edit_patient(&patient_id, update)
                .context("updating patient")?;
            println!("{}\t{}\t{}", patient.id, patient.name, patient.allergies_display());
        }
        Commands::Patient(PatientCommand::List { query, limit }) => {
            let patients = match query {
                Some(q) => db.search_patients(&q, limit)?,
                None => db.list_patients()?.into_iter().take(limit).collect(),
            };
            for p in patients {
                println!("{}\t{}\t{}", p.id, p.name, p.allergies_display());
            }
        }
        Commands::History { patient_id } => {
            let patient = db.find_patient(&patient_id)?;
            let records = db.list_prescriptions(&patient.id, true)?;
            let analysis = analyze_history(&patient, &records, chrono::Utc::now());
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Draft {
            patient_id,
            symptoms,
            diagnosis,
            doctor_id,
            doctor_name,
            save,
        } => {
            let mut orchestrator =
                PrescriptionOrchestrator::new(&db).with_timeout(config.llm.timeout());
            if let Some(service) = service {
                orchestrator = orchestrator.with_service(service);
            }

            let request = PrescriptionRequest {
                patient_id,
                symptoms,
                diagnosis,
                doctor_id,
                doctor_name,
            };
            let generated = orchestrator
                .generate(&request)
                .await
                .context("drafting prescription")?;
            println!("{}", serde_json::to_string_pretty(&generated.record)?);

            if save {
                let id = orchestrator
                    .save(generated.record)
                    .context("saving prescription")?;
                eprintln!("Saved prescription {}", id);
            }
        }
        Commands::Approve { prescription_id } => {
            let record = PrescriptionOrchestrator::new(&db)
                .approve(&prescription_id)
                .context("approving prescription")?;
            println!("{} {}", record.id, record.status.as_str());
        }
        Commands::Complete { prescription_id } => {
            let record = PrescriptionOrchestrator::new(&db)
                .complete(&prescription_id)
                .context("completing prescription")?;
            println!("{} {}", record.id, record.status.as_str());
        }
        Commands::Cancel { prescription_id } => {
            let record = PrescriptionOrchestrator::new(&db)
                .cancel(&prescription_id)
                .context("cancelling prescription")?;
            println!("{} {}", record.id, record.status.as_str());
        }
        Commands::Prescriptions { status } => {
            for record in db.list_prescriptions_by_status(status)? {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id,
                    record.date.format("%Y-%m-%d"),
                    record.patient_name,
                    record.diagnosis
                );
            }
        }
        Commands::Ask { question, patient } => {
            let patient = patient
                .map(|id| db.find_patient(&id))
                .transpose()
                .context("loading patient")?;
            let assistant = ChatAssistant::new(service).with_timeout(config.llm.timeout());
            let reply = assistant.ask(&question, patient.as_ref()).await;
            println!("{}", reply.text);
        }
    }

    Ok(())
}

fn parse_status(value: &str) -> Result<PrescriptionStatus, String> {
    PrescriptionStatus::parse(value).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected pending, active, completed or cancelled)",
            value
        )
    })
}

fn build_service(config: &SmartRxConfig) -> Option<Arc<dyn GenerativeTextService>> {
    match GeminiClient::from_config(&config.llm) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::info!(reason = %e, "Generative service not configured, using rule-based drafting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_patient_update() {
        let cli = Cli::try_parse_from([
            "smart-rx", "patient", "update", "p-1", "--allergy", "Latex", "--allergy", "Sulfa",
            "--condition", "Asthma",
        ])
        .unwrap();

        match cli.command {
            Commands::Patient(PatientCommand::Update {
                patient_id,
                name,
                allergies,
                no_allergies,
                condition,
                ..
            }) => {
                assert_eq!(patient_id, "p-1");
                assert_eq!(name, None);
                assert_eq!(allergies, Some(vec!["Latex".to_string(), "Sulfa".to_string()]));
                assert!(!no_allergies);
                assert_eq!(condition.as_deref(), Some("Asthma"));
            }
            _ => panic!("expected patient update"),
        }
    }

    #[test]
    fn test_clearing_and_replacing_allergies_conflict() {
        let result = Cli::try_parse_from([
            "smart-rx", "patient", "update", "p-1", "--allergy", "Latex", "--no-allergies",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_status_commands() {
        let cli = Cli::try_parse_from(["smart-rx", "cancel", "rx-9"]).unwrap();
        assert!(matches!(cli.command, Commands::Cancel { prescription_id } if prescription_id == "rx-9"));

        let cli = Cli::try_parse_from(["smart-rx", "complete", "rx-9"]).unwrap();
        assert!(matches!(cli.command, Commands::Complete { .. }));

        let cli = Cli::try_parse_from(["smart-rx", "prescriptions", "--status", "completed"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prescriptions { status: PrescriptionStatus::Completed }
        ));

        assert!(Cli::try_parse_from(["smart-rx", "prescriptions", "--status", "archived"]).is_err());
    }
}
