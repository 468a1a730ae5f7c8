//! fair-runner: headless FAIR risk simulation runner.
//!
//! Usage:
//!   fair-runner --scenario data/scenarios/ransomware.json
//!   fair-runner --frequency 0.1,1,10 --magnitude 1000,50000,1000000 --seed 42
//!   fair-runner --scenario s.json --db runs.db --json
//!   fair-runner --events 3 --years 2
//!   fair-runner --ipc-mode

use anyhow::{bail, Context, Result};
use fair_core::{
    config::ScenarioInput,
    distribution::CountRule,
    engine::SimEngine,
    scenario::{annualized_frequency, RiskScenario, DEFAULT_TRIAL_COUNT},
    stats::{percentile_curve, summarize, PercentilePoint, SummaryStatistics},
    store::RunStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Simulate {
        scenario: ScenarioInput,
        #[serde(default)]
        percentiles: bool,
    },
    Annualize {
        events: f64,
        years:  f64,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct IpcResponse {
    seed:        u64,
    summary:     SummaryStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentiles: Option<Vec<PercentilePoint>>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let sequential = args.iter().any(|a| a == "--sequential");
    let engine = if sequential { SimEngine::sequential() } else { SimEngine::new() };

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    if let Some(rate) = annualized_from_args(&args)? {
        println!("threat event frequency: {rate} per year");
        return Ok(());
    }

    let scenario = scenario_from_args(&args)?;
    let json = args.iter().any(|a| a == "--json");
    let show_percentiles = args.iter().any(|a| a == "--percentiles");
    let db = string_arg(&args, "--db");

    if !json {
        println!("FAIR risk simulation: fair-runner");
        println!("  trials:     {}", scenario.trial_count());
        println!("  confidence: {}", scenario.confidence());
        println!("  seed:       {}", describe_seed(scenario.random_seed()));
        println!();
    }

    let run = engine.simulate(scenario)?;
    let summary = summarize(&run);

    if let Some(db) = db {
        let store = RunStore::open(db)?;
        store.migrate()?;
        let run_id = store.record_run(&run, &summary, env!("CARGO_PKG_VERSION"))?;
        log::info!("run archived as {run_id} in {db}");
        if !json {
            println!("  archived:   {run_id}");
        }
    }

    if json {
        let response = IpcResponse {
            seed: run.seed(),
            summary,
            percentiles: show_percentiles.then(|| percentile_curve(&run)),
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&summary, run.seed());
        if show_percentiles {
            print_percentiles(&percentile_curve(&run));
        }
    }
    Ok(())
}

/// Answer one JSON request per stdin line until EOF or `quit`.
fn run_ipc_loop(engine: &SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Annualize { events, years } => match annualized_frequency(events, years) {
                Ok(rate) => writeln!(stdout, "{}", serde_json::json!({ "frequency": rate }))?,
                Err(e) => write_error(&mut stdout, &e.to_string())?,
            },
            IpcCommand::Simulate { scenario, percentiles } => {
                // Validation errors go back to the UI as messages, not exits.
                let scenario = match scenario.into_scenario() {
                    Ok(s) => s,
                    Err(e) => {
                        write_error(&mut stdout, &e.to_string())?;
                        continue;
                    }
                };
                let run = engine.simulate(scenario)?;
                let response = IpcResponse {
                    seed: run.seed(),
                    summary: summarize(&run),
                    percentiles: percentiles.then(|| percentile_curve(&run)),
                };
                writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(out, "{}", err_json)?;
    out.flush()?;
    Ok(())
}

fn scenario_from_args(args: &[String]) -> Result<RiskScenario> {
    if let Some(path) = string_arg(args, "--scenario") {
        let mut input = ScenarioInput::load(path)?;
        if let Some(seed) = parse_arg::<u64>(args, "--seed", "an integer")? {
            input.random_seed = Some(seed);
        }
        return Ok(input.into_scenario()?);
    }

    let (f_min, f_likely, f_max) = triple_arg(args, "--frequency")?.unwrap_or((0.1, 1.0, 10.0));
    let (m_min, m_likely, m_max) =
        triple_arg(args, "--magnitude")?.unwrap_or((1_000.0, 50_000.0, 1_000_000.0));
    let count_rule = match string_arg(args, "--count-rule") {
        None | Some("floor") => CountRule::Floor,
        Some("poisson") => CountRule::Poisson,
        Some(other) => bail!("unknown --count-rule '{other}' (expected floor or poisson)"),
    };

    let mut builder = RiskScenario::builder()
        .frequency(f_min, f_likely, f_max)
        .magnitude(m_min, m_likely, m_max)
        .confidence(parse_arg::<f64>(args, "--confidence", "a number in (0, 1]")?.unwrap_or(0.5))
        .trial_count(
            parse_arg::<usize>(args, "--trials", "a positive integer")?.unwrap_or(DEFAULT_TRIAL_COUNT),
        )
        .count_rule(count_rule);
    if let Some((s_min, s_likely, s_max)) = triple_arg(args, "--secondary")? {
        builder = builder.secondary_magnitude(s_min, s_likely, s_max);
    }
    Ok(builder.maybe_seed(parse_arg::<u64>(args, "--seed", "an integer")?).build()?)
}

/// `--events N --years Y`: the threat event frequency calculator.
fn annualized_from_args(args: &[String]) -> Result<Option<f64>> {
    let events = parse_arg::<f64>(args, "--events", "a number")?;
    let years = parse_arg::<f64>(args, "--years", "a number")?;
    match (events, years) {
        (None, None) => Ok(None),
        (Some(events), Some(years)) => Ok(Some(annualized_frequency(events, years)?)),
        _ => bail!("--events and --years must be given together"),
    }
}

fn print_summary(summary: &SummaryStatistics, seed: u64) {
    println!("=== ANNUAL LOSS EXPECTANCY ===");
    println!("  seed:           {seed}");
    println!("  trials:         {}", summary.trial_count);
    println!("  mean:           {}", format_currency(summary.mean));
    println!("  median:         {}", format_currency(summary.median));
    println!("  std dev:        {}", format_currency(summary.std_dev));
    println!("  p10 / p50 / p90 {} / {} / {}",
        format_currency(summary.percentile_10),
        format_currency(summary.percentile_50),
        format_currency(summary.percentile_90),
    );
    println!("  min / max:      {} / {}", format_currency(summary.min), format_currency(summary.max));
    println!("  vulnerability:  {:.2}%", summary.vulnerability_percentage * 100.0);

    let b = &summary.breakdown;
    println!();
    println!("=== PER-YEAR BREAKDOWN (min / avg / max) ===");
    println!("  loss events:    {:.0} / {:.2} / {:.0}",
        b.loss_events.min, b.loss_events.mean, b.loss_events.max);
    println!("  primary loss:   {} / {} / {}",
        format_currency(b.primary_loss.min),
        format_currency(b.primary_loss.mean),
        format_currency(b.primary_loss.max),
    );
    println!("  secondary loss: {} / {} / {}",
        format_currency(b.secondary_loss.min),
        format_currency(b.secondary_loss.mean),
        format_currency(b.secondary_loss.max),
    );

    println!();
    println!("=== HISTOGRAM ===");
    let peak = summary.histogram_buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bucket in &summary.histogram_buckets {
        let bar = "#".repeat((bucket.count * 40 / peak) as usize);
        println!("  {:>18} .. {:>18} {:>7} {bar}",
            format_currency(bucket.range_start),
            format_currency(bucket.range_end),
            bucket.count,
        );
    }
}

fn print_percentiles(curve: &[PercentilePoint]) {
    println!();
    println!("=== ALE PERCENTILE CURVE ===");
    for point in curve.iter().filter(|p| p.percentile % 5 == 0 || p.percentile == 99) {
        println!("  p{:<3} {}", point.percentile, format_currency(point.value));
    }
}

/// `$1,234,567.89`
fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${grouped}.{:02}", if negative { "-" } else { "" }, cents % 100)
}

fn describe_seed(seed: Option<u64>) -> String {
    seed.map(|s| s.to_string()).unwrap_or_else(|| "(entropy)".to_string())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn triple_arg(args: &[String], flag: &str) -> Result<Option<(f64, f64, f64)>> {
    let Some(raw) = string_arg(args, flag) else {
        return Ok(None);
    };
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{flag} expects min,likely,max numbers, got '{raw}'"))?;
    match parts.as_slice() {
        [min, likely, max] => Ok(Some((*min, *likely, *max))),
        _ => bail!("{flag} expects exactly three values (min,likely,max), got '{raw}'"),
    }
}

/// None when the flag is absent. A present but malformed value is an error.
fn parse_arg<T>(args: &[String], flag: &str, expected: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = string_arg(args, flag) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<T>()
        .with_context(|| format!("{flag} must be {expected}, got '{raw}'"))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_currency_with_grouping() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-1000.0), "-$1,000.00");
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn malformed_trial_count_is_rejected() {
        let err = scenario_from_args(&argv(&["bin", "--trials", "-5", "--seed", "1"])).unwrap_err();
        assert!(err.to_string().contains("--trials"), "unexpected error: {err}");
    }

    #[test]
    fn malformed_confidence_is_rejected() {
        let err = scenario_from_args(&argv(&["bin", "--confidence", "abc", "--seed", "1"])).unwrap_err();
        assert!(err.to_string().contains("--confidence"), "unexpected error: {err}");
    }

    #[test]
    fn out_of_range_flags_are_rejected_not_clamped() {
        assert!(scenario_from_args(&argv(&["bin", "--trials", "0"])).is_err());
        assert!(scenario_from_args(&argv(&["bin", "--confidence", "1.5"])).is_err());
    }

    #[test]
    fn absent_flags_use_defaults() {
        let scenario = scenario_from_args(&argv(&["bin", "--trials", "2000", "--seed", "3"])).unwrap();
        assert_eq!(scenario.trial_count(), 2000);
        assert_eq!(scenario.confidence(), 0.5);
        assert_eq!(scenario.random_seed(), Some(3));
    }

    #[test]
    fn annualizes_events_over_years() {
        assert_eq!(annualized_from_args(&argv(&["bin"])).unwrap(), None);
        assert_eq!(
            annualized_from_args(&argv(&["bin", "--events", "3", "--years", "2"])).unwrap(),
            Some(1.5)
        );
        assert!(annualized_from_args(&argv(&["bin", "--events", "3"])).is_err());
        assert!(annualized_from_args(&argv(&["bin", "--events", "3", "--years", "0"])).is_err());
    }

    #[test]
    fn parses_triples() {
        let args: Vec<String> = ["bin", "--frequency", "0.5, 2,4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(triple_arg(&args, "--frequency").unwrap(), Some((0.5, 2.0, 4.0)));
        assert_eq!(triple_arg(&args, "--magnitude").unwrap(), None);

        let bad: Vec<String> = ["bin", "--frequency", "1,2"].iter().map(|s| s.to_string()).collect();
        assert!(triple_arg(&bad, "--frequency").is_err());
    }
}
