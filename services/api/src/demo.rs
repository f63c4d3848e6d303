use crate::infra::{InMemorySessionRepository, SampleRankingService};
use crate::server::load_brands;
use clap::{Args, ValueEnum};
use ev_advisor::config::RankingConfig;
use ev_advisor::error::AppError;
use ev_advisor::workflows::comparison::{
    comparison_table, CompareSet, Indicator, RecommendationCard,
};
use ev_advisor::workflows::notifications::recommendation_digest;
use ev_advisor::workflows::recommendation::{
    HttpRankingService, PlaceholderPolicy, RankingService, RecommendationAdapter,
};
use ev_advisor::workflows::survey::{
    read_answer_sheets_from_path, AgeRange, DriveType, FamilyStatus, Gender, IncomeRange,
    MaritalStatus, Occupation, ProfileDraft, SeatChoice, SessionCommand, SurveyCatalog,
    SurveyService, SurveyStep, Transition, VehicleStatus,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct WeightsArgs {
    /// CSV answer sheet with a respondent_id column and one column per question
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the results as JSON instead of one line per respondent
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum DriveArg {
    Front,
    Rear,
    All,
}

impl From<DriveArg> for DriveType {
    fn from(value: DriveArg) -> Self {
        match value {
            DriveArg::Front => DriveType::FrontWheel,
            DriveArg::Rear => DriveType::RearWheel,
            DriveArg::All => DriveType::AllWheel,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Ranking service endpoint. Defaults to the bundled sample ranking.
    #[arg(long)]
    pub(crate) ranking_url: Option<String>,
    /// Option index (0-6) chosen for every question
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..7))]
    pub(crate) option: u8,
    /// Seat count preference (2, 4, 5 or 7)
    #[arg(long, default_value = "5", value_parser = parse_seats)]
    pub(crate) seats: SeatChoice,
    /// Drivetrain preference
    #[arg(long, value_enum, default_value_t = DriveArg::Front)]
    pub(crate) drive: DriveArg,
    /// How missing specification values are presented (estimated, unknown, randomized)
    #[arg(long, default_value = "estimated", value_parser = parse_placeholders)]
    pub(crate) placeholders: PlaceholderPolicy,
    /// JSON brand directory used for logo lookup
    #[arg(long)]
    pub(crate) brands: Option<PathBuf>,
}

fn parse_seats(raw: &str) -> Result<SeatChoice, String> {
    let seats = raw
        .trim()
        .parse::<u8>()
        .map_err(|err| format!("'{raw}' is not a seat count ({err})"))?;
    SeatChoice::try_from(seats)
}

fn parse_placeholders(raw: &str) -> Result<PlaceholderPolicy, String> {
    PlaceholderPolicy::from_setting(raw)
        .ok_or_else(|| format!("unknown placeholder policy '{raw}'"))
}

pub(crate) fn run_weights(args: WeightsArgs) -> Result<(), AppError> {
    let catalog = SurveyCatalog::shared_standard();
    let sheets = read_answer_sheets_from_path(&args.csv, &catalog)?;

    if args.json {
        match serde_json::to_string_pretty(&sheets) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Weights unavailable as JSON: {err}"),
        }
        return Ok(());
    }

    println!(
        "Summed weights for {} respondents ({})",
        sheets.len(),
        args.csv.display()
    );
    let total_questions = catalog.total_questions();
    for sheet in &sheets {
        let status = if sheet.complete {
            "complete".to_string()
        } else {
            format!("partial {}/{}", sheet.answered, total_questions)
        };
        println!("- {}: {} [{}]", sheet.respondent_id, sheet.weights, status);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = RankingConfig {
        placeholders: args.placeholders,
        ..RankingConfig::default()
    };
    let brands = load_brands(args.brands.as_deref())?;

    match args.ranking_url.clone() {
        Some(endpoint) => {
            config.endpoint = endpoint;
            println!("EV advisor demo (ranking service at {})", config.endpoint);
            let ranking = Arc::new(HttpRankingService::new(&config)?);
            walk_survey(ranking, &config, brands, &args).await
        }
        None => {
            println!("EV advisor demo (offline sample ranking)");
            walk_survey(Arc::new(SampleRankingService), &config, brands, &args).await
        }
    }
}

fn demo_profile() -> ProfileDraft {
    ProfileDraft {
        gender: Some(Gender::Female),
        age_range: Some(AgeRange::From35To44),
        occupation: Some(Occupation::Employed),
        marital_status: Some(MaritalStatus::Married),
        family_status: Some(FamilyStatus::WithChildren),
        income_range: Some(IncomeRange::High),
        vehicle_status: Some(VehicleStatus::Have),
        user_id: None,
    }
}

async fn walk_survey<S>(
    ranking: Arc<S>,
    config: &RankingConfig,
    brands: Arc<ev_advisor::workflows::comparison::BrandDirectory>,
    args: &DemoArgs,
) -> Result<(), AppError>
where
    S: RankingService + 'static,
{
    let adapter = Arc::new(RecommendationAdapter::from_config(ranking, config));
    let service = SurveyService::new(
        SurveyCatalog::shared_standard(),
        Arc::new(InMemorySessionRepository::default()),
        adapter,
    )
    .with_brands(brands);

    let record = service.open_session()?;
    let id = record.id;
    println!("- Opened session {}", id.as_str());

    let mut commands = vec![
        SessionCommand::Start,
        SessionCommand::UpdateProfile {
            profile: demo_profile(),
        },
        SessionCommand::ConfirmProfile,
    ];
    commands.extend(
        (0..service.catalog().total_questions()).map(|_| SessionCommand::Answer {
            option: usize::from(args.option),
        }),
    );
    commands.extend([
        SessionCommand::SelectSeats { seats: args.seats },
        SessionCommand::Next,
        SessionCommand::SelectDrive {
            drive: args.drive.into(),
        },
        SessionCommand::Next,
    ]);

    for command in commands {
        let (transition, record) = service.apply(&id, command)?;
        match transition {
            Transition::Moved { to, .. } => {
                if !matches!(to, SurveyStep::Questions { question: q, .. } if q > 0) {
                    println!(
                        "  -> {} ({}%)",
                        to.label(),
                        record.session.progress()
                    );
                }
            }
            Transition::Stayed => {}
            Transition::Rejected { gap } => {
                println!("  Survey stopped: {gap}");
                return Ok(());
            }
        }
    }

    let submission = match service.submit(&id) {
        Ok(submission) => submission,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!("- Summed weights: {}", submission.summed_weight);
    println!(
        "- Preferences: {} seats, {}",
        submission.num_seats.seats(),
        submission.drive_con.label()
    );

    let cards = match service.recommendations(&id).await {
        Ok(cards) => cards,
        Err(err) => {
            println!("  Recommendations unavailable: {err}");
            return Ok(());
        }
    };

    println!("\nRecommendations");
    for card in &cards {
        render_card(card);
    }

    let cars: Vec<_> = cards.into_iter().map(|card| card.car).collect();
    let selection = CompareSet::seeded(&cars);
    if selection.len() > 1 {
        println!("\nComparison ({})", selection.models().join(" vs "));
        for row in comparison_table(&selection.resolve(&cars)) {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|cell| {
                    let value = cell
                        .value
                        .map(|value| format!("{value:.1}"))
                        .unwrap_or_else(|| "-".to_string());
                    let marker = match cell.indicator {
                        Indicator::Best => " (best)",
                        Indicator::Worst => " (worst)",
                        Indicator::Neither => "",
                    };
                    format!("{value}{marker}")
                })
                .collect();
            println!("  {:<22} {}", row.label, cells.join(" | "));
        }
    }

    println!("\nDigest preview:\n{}", recommendation_digest(&cars, 3));
    Ok(())
}

fn render_card(card: &RecommendationCard) {
    let car = &card.car;
    println!(
        "  {}. {} - {}% ({})",
        car.rank,
        car.model,
        card.percentage,
        card.band.label()
    );
    if let Some(brand) = car.brand_name() {
        match &card.brand_logo {
            Some(logo) => println!("     brand {brand} [{logo}]"),
            None => println!("     brand {brand}"),
        }
    }
    if let Some(price) = car.estimatedthbvalue.number() {
        println!(
            "     price {:.0} THB ({})",
            price,
            car.estimatedthbvalue.source_label()
        );
    }
}
