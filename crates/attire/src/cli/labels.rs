//! `attire labels`: show what each axis can answer.

use attire_core::classify::expand;
use attire_core::config::AxisConfig;
use attire_core::{Axis, Config};
use clap::{Args, ValueEnum};
use serde::Serialize;

/// Arguments for the `labels` command.
#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Only show one axis
    #[arg(long, value_enum)]
    pub axis: Option<AxisArg>,

    /// Also list every generated prompt
    #[arg(long)]
    pub prompts: bool,

    /// Print as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Axis selector for `--axis`.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AxisArg {
    Color,
    Pattern,
    Type,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Color => Axis::Color,
            AxisArg::Pattern => Axis::Pattern,
            AxisArg::Type => Axis::Type,
        }
    }
}

#[derive(Debug, Serialize)]
struct AxisListing<'a> {
    axis: Axis,
    threshold: f32,
    labels: &'a [String],
    templates: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    prompts: Option<Vec<String>>,
}

fn listing(
    axis: Axis,
    config: &AxisConfig,
    with_prompts: bool,
) -> anyhow::Result<AxisListing<'_>> {
    let prompts = if with_prompts {
        Some(
            expand(&config.labels, &config.templates)?
                .into_iter()
                .map(|pair| pair.text)
                .collect(),
        )
    } else {
        None
    };
    Ok(AxisListing {
        axis,
        threshold: config.threshold,
        labels: &config.labels,
        templates: &config.templates,
        prompts,
    })
}

/// Execute the labels command.
pub async fn execute(args: LabelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let axes: Vec<Axis> = match args.axis {
        Some(axis) => vec![axis.into()],
        None => Axis::ALL.to_vec(),
    };

    if args.json {
        let listings = axes
            .into_iter()
            .map(|axis| listing(axis, config.axes.get(axis), args.prompts))
            .collect::<anyhow::Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    for (i, axis) in axes.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        let axis_config = config.axes.get(axis);
        println!(
            "{axis} (threshold {:.2}, {} prompts)",
            axis_config.threshold,
            axis_config.prompt_count()
        );
        println!("  labels:    {}", axis_config.labels.join(", "));
        println!("  templates:");
        for template in &axis_config.templates {
            println!("    - {template}");
        }
        if args.prompts {
            println!("  prompts:");
            for pair in expand(&axis_config.labels, &axis_config.templates)? {
                println!("    - {}", pair.text);
            }
        }
    }

    Ok(())
}
