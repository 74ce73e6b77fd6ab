use std::error::Error;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use healthmate::bridge::{Bridge, BridgeConfig, DEFAULT_API_URL, DEFAULT_MODEL};
use healthmate::prompts::{
    self, ABOUT_BLURB, DietaryPreference, MealPlanRequest, NutritionGoal, PagePrompt, TEAM,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "healthmate", about = "AI HealthMate: health pages backed by an LLM", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    bridge: BridgeArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BridgeArgs {
    /// API key for the chat-completion endpoint.
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,
    /// Model identifier sent with every request.
    #[arg(long, global = true, env = "HEALTHMATE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    /// OpenAI-compatible chat-completion URL.
    #[arg(long, global = true, env = "HEALTHMATE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

impl BridgeArgs {
    fn config(&self) -> BridgeConfig {
        BridgeConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web app.
    #[cfg(feature = "web")]
    Serve {
        /// Socket address to bind.
        #[arg(long, env = "HEALTHMATE_ADDR", default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Page chrome: `tailwind` or `bootstrap`.
        #[arg(long, env = "HEALTHMATE_THEME", default_value = "tailwind")]
        theme: healthmate::web::WebTheme,
    },
    /// Ask for the health tip of the day.
    Tip,
    /// Ask for the health word of the day.
    Word,
    /// Analyze a description of symptoms.
    Symptoms {
        /// Symptoms to analyze.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Get mental health advice.
    MentalHealth {
        /// How you are feeling.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Generate a meal plan.
    MealPlan {
        #[arg(long, default_value = "Balanced Diet", value_parser = parse_goal)]
        goal: NutritionGoal,
        #[arg(long, default_value = "No Preference", value_parser = parse_preference)]
        preference: DietaryPreference,
        /// Foods to avoid.
        #[arg(long)]
        allergies: Option<String>,
        /// Health conditions or requirements to consider.
        #[arg(long)]
        info: Option<String>,
    },
    /// List doctors near a location.
    Doctors {
        /// City or zip code.
        location: String,
    },
    /// Show the team behind the app.
    About,
}

fn parse_goal(value: &str) -> Result<NutritionGoal, String> {
    NutritionGoal::from_label(value).ok_or_else(|| {
        let options: Vec<_> = NutritionGoal::ALL.iter().map(|goal| goal.label()).collect();
        format!("expected one of: {}", options.join(", "))
    })
}

fn parse_preference(value: &str) -> Result<DietaryPreference, String> {
    DietaryPreference::from_label(value).ok_or_else(|| {
        let options: Vec<_> = DietaryPreference::ALL
            .iter()
            .map(|pref| pref.label())
            .collect();
        format!("expected one of: {}", options.join(", "))
    })
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.command);
    let config = cli.bridge.config();
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { addr, theme } => {
            let runtime = runtime()?;
            runtime.block_on(healthmate::web::serve(healthmate::web::WebConfig {
                addr,
                theme,
                bridge: config,
            }))?;
            Ok(())
        }
        Command::Tip => handle_ask(&config, prompts::tip_of_the_day(), cli.json),
        Command::Word => handle_ask(&config, prompts::word_of_the_day(), cli.json),
        Command::Symptoms { text } => {
            let prompt = prompts::symptom_check(&text.join(" "))?;
            handle_ask(&config, prompt, cli.json)
        }
        Command::MentalHealth { text } => {
            let prompt = prompts::mental_health(&text.join(" "))?;
            handle_ask(&config, prompt, cli.json)
        }
        Command::MealPlan {
            goal,
            preference,
            allergies,
            info,
        } => {
            let request = MealPlanRequest {
                goal,
                preference,
                allergies,
                additional_info: info,
            };
            handle_ask(&config, prompts::meal_plan(&request), cli.json)
        }
        Command::Doctors { location } => handle_doctors(&location, cli.json),
        Command::About => handle_about(cli.json),
    }
}

fn init_tracing(command: &Command) {
    let default_filter = match command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "healthmate=info,tower_http=info",
        _ => "healthmate=warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn Error>> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn handle_ask(
    config: &BridgeConfig,
    prompt: PagePrompt,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let bridge = Bridge::from_config(config);
    let reply = runtime()?.block_on(bridge.ask(&prompt.prompt, prompt.system_role));

    if as_json {
        let payload = json!({
            "model": bridge.model(),
            "prompt": prompt.prompt,
            "system_role": prompt.system_role,
            "reply": reply.text,
            "error": reply.error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        if let Some(error) = &reply.error {
            eprintln!("{error}");
        }
        render_markdown_block(&reply.text);
    }
    Ok(())
}

fn handle_doctors(location: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (location, doctors) = prompts::doctors_near(location)?;

    if as_json {
        let payload = json!({ "location": location, "doctors": doctors });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Showing doctors near {location}:");
    let width = doctors
        .iter()
        .map(|doc| doc.name.len())
        .max()
        .unwrap_or(4)
        .max("NAME".len());
    let specialty_width = doctors
        .iter()
        .map(|doc| doc.specialty.len())
        .max()
        .unwrap_or(9)
        .max("SPECIALTY".len());
    println!(
        "{:<width$}  {:<sw$}  {}",
        "NAME",
        "SPECIALTY",
        "CONTACT",
        width = width,
        sw = specialty_width
    );
    println!(
        "{:-<width$}  {:-<sw$}  {}",
        "",
        "",
        "----------",
        width = width,
        sw = specialty_width
    );
    for doc in doctors {
        println!(
            "{:<width$}  {:<sw$}  {}",
            doc.name,
            doc.specialty,
            doc.contact,
            width = width,
            sw = specialty_width
        );
    }
    Ok(())
}

fn handle_about(as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({ "about": ABOUT_BLURB, "team": TEAM });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    println!("{ABOUT_BLURB}\n");
    for member in &TEAM {
        println!("{} ({})", member.name, member.role);
        println!("    LinkedIn: {}", member.linkedin);
        println!("    GitHub:   {}", member.github);
    }
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
