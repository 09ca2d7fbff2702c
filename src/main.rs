use anyhow::Context;
use bbox_viz::annotation::read_boxes;
use bbox_viz::history::{plot_history, plot_history_from_path, History};
use bbox_viz::render::{NormalizedOptions, Renderer};
use bbox_viz::{io, JsonDatasetMetadata, LabelNames, RenderConfig};
use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Draw bounding boxes on images and plot training curves")]
struct Cli {
    /// Extra config file layered over the user and working-directory ones.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Open a window for every figure.
    #[arg(long, global = true)]
    show: bool,
    /// Directory for indexed and default outputs.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One image with its boxes.
    Single {
        #[arg(long)]
        image: PathBuf,
        /// JSON array of `[x_min, y_min, x_max, y_max, label]` records.
        #[arg(long)]
        boxes: PathBuf,
        /// JSON array of per-box probabilities in `[0, 1]`.
        #[arg(long)]
        probabilities: Option<PathBuf>,
        #[command(flatten)]
        names: NameArgs,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// 2x2 grid of four images.
    Grid {
        #[arg(long, num_args = 4, required = true)]
        images: Vec<PathBuf>,
        #[arg(long, num_args = 4, required = true)]
        boxes: Vec<PathBuf>,
        #[command(flatten)]
        names: NameArgs,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ground truth and predictions side by side.
    Compare {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        ground_truth: PathBuf,
        #[arg(long)]
        predicted: PathBuf,
        #[arg(long)]
        probabilities: PathBuf,
        #[command(flatten)]
        names: NameArgs,
        /// Defaults to `<output dir>/comparison-<timestamp>.png`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Raw model boxes with corner markers.
    Normalized {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        boxes: PathBuf,
        /// Boxes are `(y_min, x_min, y_max, x_max)`.
        #[arg(long)]
        axis_swap: bool,
        /// Boxes are already in pixels.
        #[arg(long)]
        pixels: bool,
        /// Save as `<output dir>/{index:03}.png`.
        #[arg(long)]
        index: Option<u32>,
        #[command(flatten)]
        names: NameArgs,
        #[arg(long)]
        title: Option<String>,
    },
    /// An image from a `<root>/<dataset>/<split>/` tree.
    Dataset {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Loss, accuracy and learning-rate charts from a JSON history.
    History {
        #[arg(long)]
        path: PathBuf,
        /// Save `loss.png`, `accuracy.png` and `lr_schedule.png` here instead of
        /// only displaying them.
        #[arg(long)]
        save_to: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct NameArgs {
    /// JSON object mapping label ids to display names.
    #[arg(long, conflicts_with = "names_literal")]
    names: Option<PathBuf>,
    /// Names as a literal, e.g. `{0: 'cat', 1: 'dog'}`.
    #[arg(long)]
    names_literal: Option<String>,
}

impl NameArgs {
    fn load(&self) -> anyhow::Result<LabelNames> {
        match (&self.names, &self.names_literal) {
            (Some(path), _) => Ok(LabelNames::from_json_file(path)?),
            (None, Some(literal)) => Ok(LabelNames::parse_names_literal(literal)?),
            (None, None) => Ok(LabelNames::new()),
        }
    }
}

fn read_probabilities(path: &Path) -> anyhow::Result<Vec<f32>> {
    io::read_json(path).with_context(|| format!("reading probabilities from {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = RenderConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.show |= cli.show;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    info!("configuration {:?}", config);

    match cli.command {
        Command::Single {
            image,
            boxes,
            probabilities,
            names,
            title,
            out,
        } => {
            let mut renderer = Renderer::new(config)?;
            let img = io::load_image(&image)?;
            let boxes = read_boxes(&boxes)?;
            let probabilities = probabilities.as_deref().map(read_probabilities).transpose()?;
            renderer.render_single(
                &img,
                &boxes,
                &names.load()?,
                probabilities.as_deref(),
                title.as_deref(),
                out.as_deref(),
            )?;
        }
        Command::Grid {
            images,
            boxes,
            names,
            title,
            out,
        } => {
            let mut renderer = Renderer::new(config)?;
            let annotations = boxes.iter().map(read_boxes).collect::<bbox_viz::Result<Vec<_>>>()?;
            let grid = renderer.render_grid(images.as_slice(), &annotations, &names.load()?, title.as_deref())?;
            if let Some(out) = out {
                io::save_image(&grid, out)?;
            }
        }
        Command::Compare {
            image,
            ground_truth,
            predicted,
            probabilities,
            names,
            out,
        } => {
            let out = out.unwrap_or_else(|| {
                let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
                config.output_dir.join(format!("comparison-{stamp}.png"))
            });
            let renderer = Renderer::new(config)?;
            let tensor = renderer.render_comparison(
                &io::load_image(&image)?,
                &read_boxes(&ground_truth)?,
                &read_boxes(&predicted)?,
                &read_probabilities(&probabilities)?,
                &names.load()?,
            )?;
            let (h, w, _) = tensor.dim();
            let composite = RgbImage::from_raw(w as u32, h as u32, tensor.into_raw_vec())
                .context("comparison tensor does not match its shape")?;
            io::save_image(&composite, out)?;
        }
        Command::Normalized {
            image,
            boxes,
            axis_swap,
            pixels,
            index,
            names,
            title,
        } => {
            let mut renderer = Renderer::new(config)?;
            let names = names.load()?;
            let options = NormalizedOptions {
                axis_swap,
                is_normalized: !pixels,
                index,
                title: title.as_deref(),
                label_names: (!names.is_empty()).then_some(&names),
            };
            if let Some(next) = renderer.render_normalized(&io::load_image(&image)?, &read_boxes(&boxes)?, options)? {
                info!("next index {next}");
            }
        }
        Command::Dataset { root, image, title, out } => {
            let mut renderer = Renderer::new(config)?;
            let metadata = JsonDatasetMetadata::new(root);
            let rendered = renderer.render_dataset_image(&metadata, &image, title.as_deref())?;
            if let Some(out) = out {
                io::save_image(&rendered, out)?;
            }
        }
        Command::History { path, save_to } => {
            let charts = match save_to {
                Some(dir) => {
                    let history = History::from_json_file(&path)?;
                    plot_history(&history, Some(&dir), config.show)?
                }
                None => plot_history_from_path(&path)?,
            };
            info!("plotted {} chart(s) from {}", charts.len(), path.display());
        }
    }
    Ok(())
}
