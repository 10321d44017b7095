use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carebridge_core::config::base_url_from_value;
use carebridge_core::constants::{
    DEFAULT_DATA_DIR, DEFAULT_DESTINATION_BASE_URL, DEFAULT_SOURCE_BASE_URL,
    DEFAULT_TERMINOLOGY_BASE_URL,
};
use carebridge_core::terminology::catalogue::{self, CATALOGUE};
use carebridge_core::{
    AccessToken, BridgeConfig, BridgeResult, CredentialStore, DestinationPatientRef, Direction,
    Ecl, HttpTransport, MigrationPipeline, PatientCriteria, PatientSearch, ReqwestTransport,
    SourceQueries, SourceServer, StageOutcome, TerminologyClient,
};

#[derive(Parser)]
#[command(name = "carebridge")]
#[command(about = "Migrate patients from an EHR FHIR server to a Primary Care FHIR server")]
struct Cli {
    /// Source EHR FHIR base URL
    #[arg(long, env = "CAREBRIDGE_SOURCE_URL", global = true)]
    source_url: Option<String>,

    /// Destination Primary Care FHIR base URL
    #[arg(long, env = "CAREBRIDGE_DESTINATION_URL", global = true)]
    destination_url: Option<String>,

    /// SNOMED CT terminology server base URL
    #[arg(long, env = "CAREBRIDGE_TERMINOLOGY_URL", global = true)]
    terminology_url: Option<String>,

    /// Directory holding access_token.json and the patient id relay file
    #[arg(long, env = "CAREBRIDGE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Parent,
    Child,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Parent => Direction::Ancestor,
            DirectionArg::Child => Direction::Descendant,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a source patient to the destination and remember the new id
    MigratePatient {
        /// Source patient id
        patient_id: String,
    },
    /// Migrate the patient's first condition as its SNOMED parent or child
    MigrateCondition {
        /// Source patient id
        patient_id: String,
        #[arg(long, value_enum)]
        direction: DirectionArg,
        /// Destination patient id (defaults to the last migrated patient)
        #[arg(long)]
        patient_ref: Option<String>,
    },
    /// Post a blood pressure panel for the destination patient
    CreateObservation {
        /// Destination patient id (defaults to the last migrated patient)
        #[arg(long)]
        patient_ref: Option<String>,
    },
    /// Post an appendectomy procedure for the destination patient
    CreateProcedure {
        /// Destination patient id (defaults to the last migrated patient)
        #[arg(long)]
        patient_ref: Option<String>,
    },
    /// Print a source patient as JSON
    Patient {
        patient_id: String,
    },
    /// Print a source resource collection as JSON (e.g. Observation)
    Resource {
        resource_type: String,
    },
    /// Search source patients
    SearchPatients {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Text contained anywhere in the address
        #[arg(long)]
        address: Option<String>,
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        born_on: Option<String>,
        /// Born strictly after this date (YYYY-MM-DD)
        #[arg(long)]
        born_after: Option<String>,
    },
    /// List a source patient's conditions
    Conditions {
        patient_id: String,
    },
    /// List a source patient's blood pressure observations
    VitalSigns {
        patient_id: String,
    },
    /// Chart the age distribution of every source patient
    AgeHistogram {
        /// Width of the longest bar
        #[arg(long, default_value_t = 50)]
        width: usize,
    },
    /// Run an ECL constraint, or a numbered one from the catalogue
    SnomedSearch {
        /// Catalogue constraint number; omit both this and CONSTRAINT to list them
        #[arg(long, conflicts_with = "constraint")]
        named: Option<u8>,
        constraint: Option<String>,
    },
    /// Look up a SNOMED concept by id
    SnomedConcept {
        concept_id: String,
    },
    /// Resolve the direct parent or child of a SNOMED concept
    SnomedNeighbour {
        concept_id: String,
        #[arg(long, value_enum)]
        direction: DirectionArg,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carebridge=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = BridgeConfig::new(
        &base_url_from_value(cli.source_url, DEFAULT_SOURCE_BASE_URL),
        &base_url_from_value(cli.destination_url, DEFAULT_DESTINATION_BASE_URL),
        &base_url_from_value(cli.terminology_url, DEFAULT_TERMINOLOGY_BASE_URL),
        cli.data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    )?;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);

    // Request failures are reported but do not change the exit status.
    if let Err(e) = run(cli.command, &cfg, transport) {
        eprintln!("Error: {e}");
    }
    Ok(())
}

fn run(
    command: Commands,
    cfg: &BridgeConfig,
    transport: Arc<dyn HttpTransport>,
) -> BridgeResult<()> {
    match command {
        Commands::MigratePatient { patient_id } => {
            let pipeline = MigrationPipeline::new(cfg, source_token(cfg), transport);
            report(&pipeline.migrate_patient(&patient_id)?);
        }
        Commands::MigrateCondition {
            patient_id,
            direction,
            patient_ref,
        } => {
            let patient_ref = parse_patient_ref(patient_ref)?;
            let pipeline = MigrationPipeline::new(cfg, source_token(cfg), transport);
            report(&pipeline.migrate_condition(&patient_id, direction.into(), patient_ref)?);
        }
        Commands::CreateObservation { patient_ref } => {
            let pipeline = MigrationPipeline::new(cfg, None, transport);
            report(&pipeline.create_observation(parse_patient_ref(patient_ref)?)?);
        }
        Commands::CreateProcedure { patient_ref } => {
            let pipeline = MigrationPipeline::new(cfg, None, transport);
            report(&pipeline.create_procedure(parse_patient_ref(patient_ref)?)?);
        }
        Commands::Patient { patient_id } => {
            print_json(&queries(cfg, transport).fetch_patient(&patient_id)?);
        }
        Commands::Resource { resource_type } => {
            print_json(&queries(cfg, transport).fetch_resource(&resource_type)?);
        }
        Commands::SearchPatients {
            name,
            gender,
            address,
            born_on,
            born_after,
        } => {
            let criteria = PatientCriteria {
                name,
                gender,
                address_contains: address,
                born_on,
                born_after,
            };
            print_patients(&queries(cfg, transport).search_patients(&criteria)?);
        }
        Commands::Conditions { patient_id } => {
            let rows = queries(cfg, transport).search_conditions(&patient_id)?;
            if rows.is_empty() {
                println!("No conditions found.");
            }
            for row in rows {
                println!("{} {} - {}", row.resource_type, row.id, row.code);
            }
        }
        Commands::VitalSigns { patient_id } => {
            let rows = queries(cfg, transport).search_vital_sign_observations(&patient_id)?;
            if rows.is_empty() {
                println!("No blood pressure observations found.");
            }
            for row in rows {
                println!(
                    "Observation {} - {} - {} - {}",
                    row.id, row.status, row.code, row.effective
                );
            }
        }
        Commands::AgeHistogram { width } => {
            let today = chrono::Utc::now().date_naive();
            let histogram = queries(cfg, transport).age_histogram(today);
            if histogram.charted() + histogram.out_of_range() + histogram.unknown() == 0 {
                println!("No patients retrieved from the server.");
            } else {
                print!("{}", histogram.render(width));
            }
        }
        Commands::SnomedSearch { named, constraint } => {
            let ecl = match (named, constraint) {
                (Some(number), _) => catalogue::named(number)?.ecl()?,
                (None, Some(constraint)) => Ecl::new(constraint)?,
                (None, None) => {
                    for entry in &CATALOGUE {
                        println!("{:>2}. {}", entry.number, entry.description);
                    }
                    return Ok(());
                }
            };
            let hits = terminology(cfg, transport).search(&ecl)?;
            if hits.is_empty() {
                println!("No concepts match {ecl}");
            }
            for hit in hits {
                println!("{} | {}", hit.concept_id, hit.preferred_term);
            }
        }
        Commands::SnomedConcept { concept_id } => {
            let concept = terminology(cfg, transport).concept(&concept_id)?;
            println!("SNOMED Concept ID: {}", concept.id);
            println!("Preferred Description: {}", concept.term);
        }
        Commands::SnomedNeighbour {
            concept_id,
            direction,
        } => {
            let direction = Direction::from(direction);
            match terminology(cfg, transport).neighbour(&concept_id, direction)? {
                Some(concept) => {
                    println!("{direction}: {} | {}", concept.concept_id, concept.preferred_term)
                }
                None => println!("No {direction} concept found for {concept_id}"),
            }
        }
    }
    Ok(())
}

fn source_token(cfg: &BridgeConfig) -> Option<AccessToken> {
    CredentialStore::from_config(cfg).load_token_or_warn()
}

fn queries(cfg: &BridgeConfig, transport: Arc<dyn HttpTransport>) -> SourceQueries {
    SourceQueries::new(SourceServer::new(
        cfg.source_base_url(),
        source_token(cfg),
        transport,
    ))
}

fn terminology(cfg: &BridgeConfig, transport: Arc<dyn HttpTransport>) -> TerminologyClient {
    TerminologyClient::new(cfg.terminology_base_url(), transport)
}

fn parse_patient_ref(raw: Option<String>) -> BridgeResult<Option<DestinationPatientRef>> {
    raw.map(DestinationPatientRef::new).transpose()
}

fn report(outcome: &StageOutcome) {
    println!("{}", outcome.summary());
    if let StageOutcome::Created { body, .. } = outcome {
        print_json(body);
    }
}

fn print_patients(search: &PatientSearch) {
    if search.rows.is_empty() {
        println!("No results found");
    }
    for row in &search.rows {
        println!(
            "{} - {} - {} {} - {}",
            row.id, row.gender, row.given, row.family, row.birth_date
        );
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!("failed to render JSON: {e}"),
    }
}
