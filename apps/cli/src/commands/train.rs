//! Training command implementation.
//!
//! Runs one simulated job to completion, rendering progress events as they arrive,
//! then optionally exports and deploys the finished model.

use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tunedeck_data::{DatasetId, DatasetStore};
use tunedeck_export::{ExportOptions, ExportService};
use tunedeck_training::{
    ChannelProgressSink, ProgressEvent, TrainingController, TrainingJob, TrainingParameters, format_hms,
};

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset file (.csv, .jsonl, .json, .txt)
    pub file: PathBuf,

    /// Base model to fine-tune
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub epochs: Option<u32>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub batch_size: Option<u32>,

    #[arg(long)]
    pub max_length: Option<u32>,

    #[arg(long)]
    pub warmup_steps: Option<u32>,

    #[arg(long)]
    pub weight_decay: Option<f64>,

    #[arg(long)]
    pub gradient_accumulation_steps: Option<u32>,

    /// Disable LoRA adapters
    #[arg(long)]
    pub no_lora: bool,

    /// Train in full precision
    #[arg(long)]
    pub full_precision: bool,

    /// Seed for the synthetic metrics (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pause once when this step is reached
    #[arg(long)]
    pub pause_at_step: Option<u64>,

    /// How long to stay paused, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub pause_secs: f64,

    /// Stop the job when this step is reached
    #[arg(long)]
    pub stop_at_step: Option<u64>,

    /// Export the finished model in this format (see `tunedeck catalog`)
    #[arg(long)]
    pub export: Option<String>,

    /// Base file name for the exported artifact
    #[arg(long)]
    pub model_name: Option<String>,

    /// Quantization label recorded on the artifact
    #[arg(long)]
    pub quantization: Option<String>,

    /// Connect to and deploy to this target (see `tunedeck catalog`)
    #[arg(long)]
    pub deploy: Option<String>,

    /// Print events and the final job as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl TrainArgs {
    fn parameters(&self, dataset_id: DatasetId) -> TrainingParameters {
        let mut params = TrainingParameters::for_dataset(dataset_id);
        if let Some(ref model) = self.model {
            params.model = model.clone();
        }
        if let Some(epochs) = self.epochs {
            params.epochs = epochs;
        }
        if let Some(lr) = self.learning_rate {
            params.learning_rate = lr;
        }
        if let Some(batch_size) = self.batch_size {
            params.batch_size = batch_size;
        }
        if let Some(max_length) = self.max_length {
            params.max_length = max_length;
        }
        if let Some(warmup) = self.warmup_steps {
            params.warmup_steps = warmup;
        }
        if let Some(decay) = self.weight_decay {
            params.weight_decay = decay;
        }
        if let Some(accumulation) = self.gradient_accumulation_steps {
            params.gradient_accumulation_steps = accumulation;
        }
        params.use_lora = !self.no_lora;
        params.use_half_precision = !self.full_precision;
        params
    }
}

pub async fn execute(args: TrainArgs, config: &CliConfig) -> Result<()> {
    let store = DatasetStore::new();
    let record = store
        .process_path(&args.file)
        .await
        .with_context(|| format!("Failed to read dataset {}", args.file.display()))?;
    if !record.is_ready() {
        bail!("{} is not a valid dataset: {}", record.name, record.error.unwrap_or_default());
    }

    let mut sim_config = config.simulator_config();
    if let Some(seed) = args.seed {
        sim_config = sim_config.with_seed(seed);
    }

    let (sink, mut events) = ChannelProgressSink::new();
    let controller = TrainingController::with_sink(Arc::new(store), sim_config, Arc::new(sink))
        .context("Invalid simulator configuration")?;
    let job = controller.start(args.parameters(record.id.clone())).await?;

    if !args.json {
        println!("{}", "tunedeck train".bold().cyan());
        println!();
        println!("  Dataset: {} ({} examples)", record.name, record.example_count());
        println!("  Model:   {}", job.params.model);
        println!("  Job:     {}", job.id.to_string().dimmed());
        println!();
    }

    let mut paused_once = false;
    while let Some(event) = events.recv().await {
        if event.job_id() != &job.id {
            continue;
        }
        render_event(&event, args.json)?;

        match event {
            ProgressEvent::Step { step, .. } => {
                if args.stop_at_step.is_some_and(|s| step >= s) {
                    controller.stop(&job.id).await;
                } else if !paused_once && args.pause_at_step.is_some_and(|s| step >= s) {
                    paused_once = true;
                    controller.pause(&job.id).await;
                    tokio::time::sleep(Duration::from_secs_f64(args.pause_secs.max(0.0))).await;
                    controller.resume(&job.id).await;
                }
            }
            ProgressEvent::Finished { .. } => break,
            _ => {}
        }
    }

    let finished = controller.get(&job.id).await.context("Training job disappeared")?;
    controller.shutdown();

    let service = ExportService::new(config.export_config());
    let artifact = match args.export {
        Some(ref format) => {
            let options = ExportOptions { model_name: args.model_name.clone(), quantization: args.quantization.clone() };
            Some(service.export_model(&finished, format, options).await?)
        }
        None => None,
    };
    let deployment = match args.deploy {
        Some(ref target) => {
            service.connect_cloud_provider(target).await?;
            Some(service.deploy_to_cloud(&finished, target).await?)
        }
        None => None,
    };

    if args.json {
        let out = json!({ "type": "summary", "job": finished, "artifact": artifact, "deployment": deployment });
        println!("{}", serde_json::to_string(&out)?);
        return Ok(());
    }

    print_summary(&finished);
    if let Some(artifact) = artifact {
        println!("  Exported:  {} ({})", artifact.file_name.green(), artifact.size_label);
    }
    if let Some(deployment) = deployment {
        println!("  Deployed:  {}", deployment.target_name.green());
    }
    println!();
    Ok(())
}

fn render_event(event: &ProgressEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        ProgressEvent::StatusChanged { from, to, .. } => {
            println!("  {} {} → {}", "status".bold(), from.to_string().dimmed(), to.to_string().cyan());
        }
        ProgressEvent::Metric { metric, .. } => println!(
            "  {} step {:>5}  train {:.4}  val {:.4}",
            "metric".bold(),
            metric.step,
            metric.training_loss,
            metric.validation_loss
        ),
        ProgressEvent::Log { line, .. } => println!("  {}", line.dimmed()),
        ProgressEvent::Created { .. } | ProgressEvent::Step { .. } | ProgressEvent::Finished { .. } => {}
    }
    Ok(())
}

fn print_summary(job: &TrainingJob) {
    println!();
    println!("{}", "Training Summary".bold().cyan());
    println!();
    println!("  Status:    {}", job.status.to_string().green().bold());
    println!("  Steps:     {}/{} ({:.1}%)", job.current_step, job.total_steps, job.progress);
    println!("  Elapsed:   {}", format_hms(job.elapsed_time));
    if let Some(metric) = job.latest_metric() {
        println!("  Loss:      train {:.4}, val {:.4}", metric.training_loss, metric.validation_loss);
    }
    for metric in &job.evaluation_metrics {
        println!("  {:<10} {:.2}", format!("{}:", metric.metric), metric.value);
    }
}
