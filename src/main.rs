use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contactsheet::detection::crop::DEFAULT_THUMB_SIZE;
use contactsheet::detection::faces::{RustfaceDetector, DEFAULT_MIN_FACE_SIZE};
use contactsheet::detection::ocr::{self, OcrsTextExtractor, DEFAULT_OCR_LONG_SIDE};
use contactsheet::pipeline::{prepare_debug_dir, DebugConfig};
use contactsheet::render::{render, save_png};
use contactsheet::variants::{load_image, DEFAULT_INTENSITIES};
use contactsheet::{
    ArchiveScanner, CaptionStyle, ChannelVariants, ContactSheet, ExtractorConfig, GridLayoutSpec,
    KeywordFaceExtractor, PipelineContext, Presentation, SheetItem,
};

#[derive(Parser)]
#[command(name = "contactsheet")]
#[command(about = "Build contact sheets of channel variants or of faces found in image archives")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Brightness-scale each color channel and lay the variants out in a grid
    Variants {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Where to write the sheet (PNG)
        #[arg(short, long, value_name = "PATH")]
        out: PathBuf,

        /// Brightness factors applied to each channel
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_INTENSITIES.to_vec())]
        intensities: Vec<f32>,

        /// TrueType font for captions; captions are omitted without it
        #[arg(long, value_name = "TTF")]
        font: Option<PathBuf>,

        #[arg(long, default_value_t = 55.0)]
        font_size: f32,

        #[arg(long, default_value_t = 3)]
        columns: u32,

        #[arg(long, default_value_t = 15)]
        gap: u32,

        #[arg(long, default_value_t = 75)]
        caption_height: u32,

        /// Divide the final sheet's width and height by this factor
        #[arg(long, default_value_t = 2)]
        downscale: u32,
    },

    /// Find archive images mentioning a keyword and collect the faces in them
    Faces {
        /// ZIP archive of images
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Text to look for in each image
        #[arg(short, long)]
        keyword: String,

        #[arg(long)]
        ignore_case: bool,

        /// SeetaFace detection model (seeta_fd_frontal_v1.0.bin)
        #[arg(long, value_name = "PATH")]
        face_model: PathBuf,

        /// Directory holding text-detection.rten and text-recognition.rten
        #[arg(long, value_name = "DIR")]
        ocr_models: Option<PathBuf>,

        /// Directory for the per-entry face sheets
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_THUMB_SIZE)]
        thumb_size: u32,

        #[arg(long, default_value_t = 5)]
        columns: u32,

        #[arg(long, default_value_t = DEFAULT_OCR_LONG_SIDE)]
        ocr_long_side: u32,

        /// Smallest face edge, in pixels, the detector looks for
        #[arg(long, default_value_t = DEFAULT_MIN_FACE_SIZE)]
        min_face_size: u32,

        /// Save intermediate stage images to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "contactsheet=debug" } else { "contactsheet=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match args.command {
        Command::Variants {
            image_path,
            out,
            intensities,
            font,
            font_size,
            columns,
            gap,
            caption_height,
            downscale,
        } => {
            let img = load_image(&image_path)?;
            let variants: Vec<_> = ChannelVariants::new(&img, &intensities)?.collect();

            let captions = font
                .map(|path| CaptionStyle::load(path, font_size))
                .transpose()?;

            let layout = GridLayoutSpec::variant_sheet()
                .with_columns(columns)
                .with_gap(gap)
                .with_caption_height(caption_height);

            let items: Vec<SheetItem<'_>> = variants
                .iter()
                .map(|v| SheetItem::captioned(&v.image, &v.caption))
                .collect();
            let sheet = ContactSheet::compose(&items, &layout, captions.as_ref())?;

            let output = render(&sheet.image, Some(downscale));
            save_png(&output, &out)?;
            println!("Wrote {} variants to {}", variants.len(), out.display());
        }

        Command::Faces {
            archive,
            keyword,
            ignore_case,
            face_model,
            ocr_models,
            out_dir,
            thumb_size,
            columns,
            ocr_long_side,
            min_face_size,
            debug_out,
        } => {
            let context = match debug_out {
                Some(dir) => {
                    prepare_debug_dir(&dir)?;
                    PipelineContext { debug: Some(DebugConfig { output_dir: dir }) }
                }
                None => PipelineContext::default(),
            };

            let model_dir = ocr_models.unwrap_or_else(ocr::default_model_dir);
            let text = OcrsTextExtractor::from_model_dir(&model_dir)?;
            let detector = RustfaceDetector::from_file(&face_model)?.with_min_face_size(min_face_size);

            let mut config = ExtractorConfig::new(keyword);
            config.matcher = config.matcher.ignore_case(ignore_case);
            config.ocr_long_side = ocr_long_side;
            config.thumb_size = thumb_size;

            let extractor = KeywordFaceExtractor::new(config, Arc::new(text), Arc::new(detector))
                .with_context(context);

            let mut scanner = ArchiveScanner::open(&archive)?;
            println!("The archive contains {} files.", scanner.len());
            let report = extractor.scan(&mut scanner);

            let layout = GridLayoutSpec::face_sheet(thumb_size).with_columns(columns);
            for result in report.matched() {
                println!("\nResults found in file {}", result.name);
                match result.present(&layout)? {
                    Some(Presentation::Sheet(sheet)) => {
                        let path = out_dir.join(format!("{}.png", result.name.replace('/', "_")));
                        save_png(&sheet, &path)?;
                        println!("{} faces, sheet written to {}", result.outcome.face_count(), path.display());
                    }
                    Some(Presentation::Notice(notice)) => println!("{}", notice),
                    None => {}
                }
            }

            for (name, reason) in &report.skipped {
                println!("Skipped {}: {}", name, reason);
            }
        }
    }

    Ok(())
}
