use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{self, Settings},
    forms::{attachments::Attachment, pet::FieldValue},
    location::{CoordinateGeocoder, FixedLocation, Geocoder, GoogleGeocoder},
    notifications::{register_device, FixedToken},
    share::{contact_link, share_message},
    ClientError, FormError, LomitoClient, LostReportForm, PetField, PetFormController,
    PublicSightingForm, ReportSightingForm, Session, StepOutcome, UserNotice,
};
use shared::{
    domain::{Coordinates, NotificationId, PetId, ReportId, SightingId, UserId},
    protocol::{ActiveReportsQuery, PublicSightingsQuery},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod print;

#[derive(Parser, Debug)]
#[command(name = "lomito", about = "Lost-pet reports from the command line")]
struct Cli {
    /// Overrides `api_url` from lomito.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    user_id: Option<String>,
    #[arg(long, global = true)]
    geocoding_key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Pets(PetsCommand),
    #[command(subcommand)]
    Reports(ReportsCommand),
    #[command(subcommand)]
    Sightings(SightingsCommand),
    #[command(subcommand)]
    Notifications(NotificationsCommand),
}

#[derive(Subcommand, Debug)]
enum PetsCommand {
    List {
        /// Defaults to the session user.
        #[arg(long)]
        owner: Option<String>,
    },
    Show {
        pet_id: String,
    },
    Delete {
        pet_id: String,
    },
    Register(PetFields),
    Edit {
        pet_id: String,
        #[command(flatten)]
        fields: PetFields,
    },
}

#[derive(Args, Debug)]
struct PetFields {
    /// `field=value` using API field names, e.g. `name=Bruno`, `hasSpots=true`.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    values: Vec<String>,
    #[arg(long = "photo")]
    photos: Vec<PathBuf>,
    /// Toggles a temperament label; repeat for several.
    #[arg(long = "temperament")]
    temperaments: Vec<String>,
}

#[derive(Args, Debug, Clone, Copy)]
struct Position {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

impl Position {
    fn coordinates(self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

#[derive(Subcommand, Debug)]
enum ReportsCommand {
    Nearby {
        #[command(flatten)]
        position: Position,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    Show {
        report_id: String,
    },
    Create {
        #[arg(long)]
        pet: String,
        #[command(flatten)]
        position: Position,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        radius_km: Option<u32>,
    },
    Share {
        report_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum SightingsCommand {
    List {
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    Show {
        sighting_id: String,
    },
    Create {
        #[command(flatten)]
        position: Position,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "Perro")]
        species: String,
        #[arg(long, default_value = "Mediano")]
        size: String,
        /// Comma separated.
        #[arg(long)]
        colors: String,
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
    Comment {
        sighting_id: String,
        comment: String,
    },
    AddToReport {
        report_id: String,
        #[command(flatten)]
        position: Position,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationsCommand {
    MarkRead { notification_id: String },
    RegisterToken { token: String },
}

struct App {
    client: LomitoClient,
    session: Session,
    geocoder: Box<dyn Geocoder>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        if let Some(notice) = notice_for(&err) {
            eprintln!("{}: {}", notice.title, notice.message);
        }
        return Err(err);
    }
    Ok(())
}

fn notice_for(err: &anyhow::Error) -> Option<UserNotice> {
    if let Some(client) = err.downcast_ref::<ClientError>() {
        return Some(client.user_notice());
    }
    match err.downcast_ref::<FormError>()? {
        FormError::Submit(client) => Some(client.user_notice()),
        other => other.to_client_error().map(|client| client.user_notice()),
    }
}

fn settings_for(cli: &Cli) -> Settings {
    let mut settings = config::load_settings();
    if let Some(url) = &cli.api_url {
        settings.api_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = secs;
    }
    if let Some(user_id) = &cli.user_id {
        settings.user_id = Some(user_id.clone());
    }
    if let Some(key) = &cli.geocoding_key {
        settings.geocoding_api_key = Some(key.clone());
    }
    settings
}

async fn run(cli: Cli) -> Result<()> {
    let settings = settings_for(&cli);
    debug!(api_url = %settings.api_url, "settings loaded");
    let client = LomitoClient::new(&settings).context("failed to configure API client")?;
    let session = Session::from_config(settings.user_id.as_deref());
    let geocoder: Box<dyn Geocoder> = match &settings.geocoding_api_key {
        Some(key) if !key.trim().is_empty() => Box::new(
            GoogleGeocoder::new(key.trim()).context("failed to configure geocoder")?,
        ),
        _ => Box::new(CoordinateGeocoder),
    };
    let app = App {
        client,
        session,
        geocoder,
    };

    match cli.command {
        Command::Pets(command) => pets(&app, command).await,
        Command::Reports(command) => reports(&app, command).await,
        Command::Sightings(command) => sightings(&app, command).await,
        Command::Notifications(command) => notifications(&app, command).await,
    }
}

async fn pets(app: &App, command: PetsCommand) -> Result<()> {
    match command {
        PetsCommand::List { owner } => {
            let owner = owner
                .map(UserId::new)
                .unwrap_or_else(|| app.session.user_id().clone());
            let pets = app.client.list_my_pets(&owner).await?;
            if pets.is_empty() {
                println!("no pets registered for {owner}");
            }
            for pet in &pets {
                println!("{}", print::pet_line(pet));
            }
        }
        PetsCommand::Show { pet_id } => {
            let pet = app.client.get_pet(&PetId::new(pet_id)).await?;
            print::json(&pet)?;
        }
        PetsCommand::Delete { pet_id } => {
            let pet_id = PetId::new(pet_id);
            app.client.delete_pet(&pet_id).await?;
            println!("deleted pet {pet_id}");
        }
        PetsCommand::Register(fields) => {
            let mut form = PetFormController::register();
            fields.apply(&mut form)?;
            walk_wizard(app, &mut form).await?;
        }
        PetsCommand::Edit { pet_id, fields } => {
            let mut form = PetFormController::load_for_edit(&app.client, PetId::new(pet_id))
                .await
                .context("failed to load pet for editing")?;
            fields.apply(&mut form)?;
            walk_wizard(app, &mut form).await?;
        }
    }
    Ok(())
}

impl PetFields {
    fn apply(&self, form: &mut PetFormController) -> Result<()> {
        for entry in &self.values {
            let (name, raw) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{entry}'"))?;
            let field = PetField::from_wire(name.trim())
                .ok_or_else(|| anyhow!("unknown pet field '{name}'"))?;
            form.update_field(field, field_value(field, raw)?)?;
        }
        for label in &self.temperaments {
            form.toggle_temperament(label)?;
        }
        for path in &self.photos {
            form.add_photo(Attachment::from_path(path))?;
        }
        Ok(())
    }
}

fn field_value(field: PetField, raw: &str) -> Result<FieldValue> {
    Ok(match field {
        PetField::HasSpots | PetField::IsVaccinated | PetField::HasIllness => {
            match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "si" | "sí" | "yes" | "1" => FieldValue::Flag(true),
                "false" | "no" | "0" => FieldValue::Flag(false),
                other => bail!("'{other}' is not a yes/no value for {}", field.wire_name()),
            }
        }
        PetField::Photos => FieldValue::Photo(Attachment::from_path(raw.trim())),
        _ => FieldValue::from(raw),
    })
}

/// Drives the wizard step by step, the same way the screens do.
async fn walk_wizard(app: &App, form: &mut PetFormController) -> Result<()> {
    loop {
        match form.advance(&app.client).await? {
            StepOutcome::Moved { step } => {
                info!(step, total = form.total_steps(), "pet form step complete");
            }
            StepOutcome::Submitted { pet_id } => {
                println!("saved pet {pet_id}");
                return Ok(());
            }
        }
    }
}

async fn reports(app: &App, command: ReportsCommand) -> Result<()> {
    match command {
        ReportsCommand::Nearby {
            position,
            limit,
            offset,
        } => {
            let reports = app
                .client
                .active_reports(&ActiveReportsQuery {
                    user_lat: position.lat,
                    user_lon: position.lon,
                    limit,
                    offset,
                })
                .await?;
            if reports.is_empty() {
                println!("no active reports nearby");
            }
            for report in &reports {
                println!("{}", print::report_line(report));
            }
        }
        ReportsCommand::Show { report_id } => {
            let report = app.client.get_report(&ReportId::new(report_id)).await?;
            print::json(&report)?;
        }
        ReportsCommand::Create {
            pet,
            position,
            notes,
            radius_km,
        } => {
            let record = app.client.get_pet(&PetId::new(pet)).await?;
            let mut form = LostReportForm::for_pet(&record, &app.session)?;
            form.locate(
                &FixedLocation(Some(position.coordinates())),
                app.geocoder.as_ref(),
            )
            .await?;
            form.set_notes(notes)?;
            if let Some(radius) = radius_km {
                form.set_radius_km(radius)?;
            }
            let report_id = form.submit(&app.client).await?;
            println!("created report {report_id}");
        }
        ReportsCommand::Share { report_id } => {
            let report = app.client.get_report(&ReportId::new(report_id)).await?;
            println!("{}", share_message(&report));
            if let Some(link) = contact_link(&report) {
                println!("{link}");
            }
        }
    }
    Ok(())
}

async fn sightings(app: &App, command: SightingsCommand) -> Result<()> {
    match command {
        SightingsCommand::List {
            lat,
            lon,
            radius,
            limit,
            offset,
        } => {
            let sightings = app
                .client
                .public_sightings(&PublicSightingsQuery {
                    latitude: lat,
                    longitude: lon,
                    radius,
                    limit,
                    offset,
                })
                .await?;
            if sightings.is_empty() {
                println!("no public sightings");
            }
            for sighting in &sightings {
                println!("{}", print::sighting_line(sighting));
            }
        }
        SightingsCommand::Show { sighting_id } => {
            let sighting = app
                .client
                .get_public_sighting(&SightingId::new(sighting_id))
                .await?;
            print::json(&sighting)?;
        }
        SightingsCommand::Create {
            position,
            description,
            species,
            size,
            colors,
            photos,
        } => {
            let mut form = PublicSightingForm::new(app.session.user_id().clone());
            form.set_pin(position.coordinates(), app.geocoder.as_ref())
                .await?;
            form.set_description(description)?;
            form.set_species(species)?;
            form.set_approximate_size(size)?;
            form.set_colors(colors)?;
            for path in photos {
                form.add_photo(Attachment::from_path(path))?;
            }
            form.submit(&app.client).await?;
            println!("sighting published");
        }
        SightingsCommand::Comment {
            sighting_id,
            comment,
        } => {
            app.client
                .comment_on_sighting(
                    &SightingId::new(sighting_id),
                    app.session.user_id(),
                    &comment,
                )
                .await?;
            println!("comment posted");
        }
        SightingsCommand::AddToReport {
            report_id,
            position,
            notes,
            photos,
        } => {
            let mut form =
                ReportSightingForm::new(ReportId::new(report_id), app.session.user_id().clone());
            form.set_pin(position.coordinates(), app.geocoder.as_ref())
                .await?;
            form.set_notes(notes)?;
            for path in photos {
                form.add_photo(Attachment::from_path(path))?;
            }
            form.submit(&app.client).await?;
            println!("sighting added to report {}", form.report_id());
        }
    }
    Ok(())
}

async fn notifications(app: &App, command: NotificationsCommand) -> Result<()> {
    match command {
        NotificationsCommand::MarkRead { notification_id } => {
            let id = NotificationId::new(notification_id);
            app.client.mark_notification_read(&id).await?;
            println!("notification {id} marked as read");
        }
        NotificationsCommand::RegisterToken { token } => {
            match register_device(&app.client, &app.session, &FixedToken(token)).await {
                Some(_) => println!("device registered for {}", app.session.user_id()),
                None => bail!("device registration failed; see logs"),
            }
        }
    }
    Ok(())
}
