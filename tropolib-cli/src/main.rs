use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use tropolib_aws::{split_net_across_region, split_net_across_zones, zones};
use tropolib_core::Template;

mod config;

use config::{DEFAULT_STACK_FILE, StackConfig};

#[derive(Parser)]
#[command(name = "tropolib")]
#[command(about = "Generate CloudFormation templates for AWS networks and HTTP APIs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the template described by a stack file
    Generate {
        /// Path to the stack file
        #[arg(default_value = DEFAULT_STACK_FILE)]
        file: PathBuf,

        /// Write the template to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Check that the output file is up to date (don't write)
        #[arg(long)]
        check: bool,

        /// Show diff against the output file
        #[arg(long)]
        diff: bool,
    },
    /// Build and validate the stack file
    Validate {
        /// Path to the stack file
        #[arg(default_value = DEFAULT_STACK_FILE)]
        file: PathBuf,
    },
    /// Show how a CIDR block is split across availability zones
    Split {
        cidr: String,

        #[arg(long, short)]
        region: String,

        /// Number of subnets, a power of 2
        #[arg(long, short, default_value_t = 4)]
        count: u32,

        /// Zones to use instead of the region's (comma separated)
        #[arg(long, value_delimiter = ',')]
        zones: Vec<String>,
    },
    /// List known regions, or the availability zones of one region
    Zones { region: Option<String> },
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            file,
            output,
            format,
            check,
            diff,
        } => run_generate(&file, output.as_deref(), format, check, diff),
        Commands::Validate { file } => run_validate(&file),
        Commands::Split {
            cidr,
            region,
            count,
            zones,
        } => run_split(&cidr, &region, count, &zones),
        Commands::Zones { region } => run_zones(region.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn render(template: &Template, format: OutputFormat) -> Result<String, String> {
    let rendered = match format {
        OutputFormat::Yaml => template.to_yaml(),
        OutputFormat::Json => template.to_json().map(|json| json + "\n"),
    };
    rendered.map_err(|e| e.to_string())
}

fn run_generate(
    file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    check: bool,
    show_diff: bool,
) -> Result<(), String> {
    let template = StackConfig::load(file)?.build()?;
    let rendered = render(&template, format)?;

    let Some(output) = output else {
        if check || show_diff {
            return Err("--check and --diff need an output file (-o)".to_string());
        }
        print!("{}", rendered);
        return Ok(());
    };

    // A missing output file compares as empty
    let current = if output.exists() {
        fs::read_to_string(output)
            .map_err(|e| format!("Failed to read {}: {}", output.display(), e))?
    } else {
        String::new()
    };
    let up_to_date = current == rendered;

    if show_diff && !up_to_date {
        print_diff(output, &current, &rendered);
    }

    if check {
        return if up_to_date {
            println!("{}", format!("{} is up to date.", output.display()).green());
            Ok(())
        } else {
            Err(format!("{} is out of date", output.display()))
        };
    }

    if up_to_date {
        println!("{}", format!("{} is already up to date.", output.display()).green());
    } else {
        fs::write(output, &rendered)
            .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
        println!(
            "{} {} ({} resources)",
            "Wrote:".green(),
            output.display(),
            template.len()
        );
    }
    Ok(())
}

fn run_validate(file: &Path) -> Result<(), String> {
    let config = StackConfig::load(file)?;

    println!("{}", "Validating...".cyan());

    let template = config.build()?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", template.len())
            .green()
            .bold()
    );

    for resource in template.resources() {
        println!("  • {} {}", resource.resource_type, resource.title);
    }

    Ok(())
}

fn run_split(cidr: &str, region: &str, count: u32, zone_list: &[String]) -> Result<(), String> {
    let segments = if zone_list.is_empty() {
        split_net_across_region(cidr, region, count)
    } else {
        split_net_across_zones(cidr, zone_list, count)
    }
    .map_err(|e| e.to_string())?;

    println!("{} {} into {} subnets:", "Split".cyan().bold(), cidr, segments.len());
    for (index, segment) in segments.iter().enumerate() {
        println!("  {:>3}  {:<18} {}", index + 1, segment.cidr.to_string(), segment.az);
    }
    Ok(())
}

fn run_zones(region: Option<&str>) -> Result<(), String> {
    match region {
        Some(region) => {
            let azs = zones::availability_zones(region)
                .ok_or_else(|| format!("Unknown region '{}'", region))?;
            for az in azs {
                println!("{}", az);
            }
        }
        None => {
            for region in zones::regions() {
                println!("{}", region);
            }
        }
    }
    Ok(())
}

fn print_diff(file: &Path, current: &str, rendered: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(current, rendered);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = "\
description: CLI test
vpc:
  name: Cli
  region: eu-west-1
  cidr_block: 10.0.0.0/16
  public_subnets:
    - name: Public
      cidr_block: 10.0.0.0/20
      count: 2
";

    fn stack_file(dir: &Path) -> PathBuf {
        let path = dir.join(DEFAULT_STACK_FILE);
        fs::write(&path, STACK).unwrap();
        path
    }

    #[test]
    fn generate_writes_then_checks_output() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_file(dir.path());
        let out = dir.path().join("template.yaml");

        assert!(run_generate(&stack, Some(&out), OutputFormat::Yaml, true, false).is_err());
        run_generate(&stack, Some(&out), OutputFormat::Yaml, false, false).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        let document: serde_json::Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(document["Description"], "CLI test");
        assert_eq!(document["Resources"]["Public2"]["Type"], "AWS::EC2::Subnet");

        run_generate(&stack, Some(&out), OutputFormat::Yaml, true, true).unwrap();
    }

    #[test]
    fn generate_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_file(dir.path());
        let out = dir.path().join("template.json");

        run_generate(&stack, Some(&out), OutputFormat::Json, false, false).unwrap();
        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(document["Outputs"]["VpcId"]["Value"]["Ref"], "CliVpc");

        // the YAML rendering differs, so a check against the JSON file fails
        assert!(run_generate(&stack, Some(&out), OutputFormat::Yaml, true, false).is_err());
    }

    #[test]
    fn check_requires_output() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_file(dir.path());
        assert!(run_generate(&stack, None, OutputFormat::Yaml, true, false).is_err());
    }

    #[test]
    fn validate_reports_stack_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(
            &path,
            "vpc:\n  region: eu-west-1\n  cidr_block: 10.0.0.0/16\n  natted_subnets:\n    - name: App\n      cidr_block: 10.0.16.0/20\n",
        )
        .unwrap();
        let err = run_validate(&path).unwrap_err();
        assert_eq!(err, "VPC VPC: Can't find NAT gateway in eu-west-1a");

        assert!(run_validate(&stack_file(dir.path())).is_ok());
    }

    #[test]
    fn split_and_zones_commands() {
        assert!(run_split("10.0.0.0/16", "eu-west-1", 4, &[]).is_ok());
        assert!(run_split("10.0.0.0/16", "", 2, &["us-east-1a".to_string()]).is_ok());
        assert!(run_split("10.0.0.0/16", "eu-west-1", 3, &[]).is_err());
        assert!(run_zones(Some("eu-west-1")).is_ok());
        assert!(run_zones(Some("mars-north-1")).is_err());
        assert!(run_zones(None).is_ok());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "tropolib", "-vv", "generate", "stack.yaml", "-o", "out.json", "--format", "json",
            "--check",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Generate {
            file,
            output,
            format,
            check,
            diff,
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(file, PathBuf::from("stack.yaml"));
        assert_eq!(output, Some(PathBuf::from("out.json")));
        assert_eq!(format, OutputFormat::Json);
        assert!(check);
        assert!(!diff);

        let cli = Cli::try_parse_from([
            "tropolib", "split", "10.0.0.0/16", "--region", "eu-west-1", "--zones", "a,b",
        ])
        .unwrap();
        let Commands::Split { zones, count, .. } = cli.command else {
            panic!("expected split");
        };
        assert_eq!(zones, vec!["a", "b"]);
        assert_eq!(count, 4);
    }
}
