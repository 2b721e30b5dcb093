use clap::Parser;
use log::{info, warn};
use pixcache::{
    image::{
        loader::{DirResources, ImageLoader},
        shaper::{CircleShaper, RoundRectShaper, ShapeSize},
        transform::{Resize, ScalingMode},
    },
    state::options::DisplayOptions,
    utils::{
        cli::{mib_to_bytes, Cli, Command},
        error::format_bytes,
    },
    Configuration, Context, PixError, PixResult, Pixcache,
};
use std::{fs, sync::Arc};

fn main() -> PixResult<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Command::Resolve {
            resources,
            ids,
            resize,
            scaling,
            shape_size,
            radius,
            circle,
            low_quality,
            repeat,
            output,
            memory_cache_mb,
            bitmap_pool_mb,
        } => {
            let scaling: ScalingMode = scaling.parse()?;
            let mut options = DisplayOptions::new().low_quality_image(low_quality);
            if let Some(resize) = resize {
                options = options.resize(resize.parse::<Resize>()?.with_scaling(scaling));
            }
            if let Some(shape_size) = shape_size {
                options = options.shape_size(shape_size.parse::<ShapeSize>()?);
            }
            if let Some(radius) = radius {
                options = options.shaper(Arc::new(RoundRectShaper::new(radius)));
            } else if circle {
                options = options.shaper(Arc::new(CircleShaper));
            }

            let context = Context::new(Arc::new(DirResources::new(&resources)));
            let sketch = Pixcache::new(
                Configuration::builder(context)
                    .memory_cache_size(mib_to_bytes(memory_cache_mb))
                    .bitmap_pool_size(mib_to_bytes(bitmap_pool_mb))
                    .build(),
            );

            if let Some(dir) = &output {
                fs::create_dir_all(dir)?;
            }

            for round in 1..=repeat.max(1) {
                let results = sketch.state_images(&ids, &options);
                for (id, result) in ids.iter().zip(results) {
                    let drawable = match result {
                        Ok(drawable) => drawable,
                        Err(err) => {
                            warn!("[{}] {}: {}", round, id, err);
                            continue;
                        }
                    };
                    let from = drawable
                        .image_from()
                        .map_or_else(|| "RESOURCE".to_string(), |from| from.to_string());
                    let (width, height) = drawable.intrinsic_size().unwrap_or_default();
                    println!("[{round}] {id}: {width}x{height} from {from}");

                    if let (Some(dir), Some(image)) = (&output, drawable.to_rgba()) {
                        image.save(dir.join(format!("{id}.png")))?;
                    }
                }
            }

            let config = sketch.configuration();
            let pool_stats = config.bitmap_pool().stats();
            info!(
                "memory cache {} entries, {}; bitmap pool {}, hits {}, misses {}, puts {}",
                config.memory_cache().len(),
                format_bytes(config.memory_cache().size()),
                format_bytes(config.bitmap_pool().size()),
                pool_stats.hits,
                pool_stats.misses,
                pool_stats.puts
            );
        }
        Command::Match {
            uri,
            resources,
            assets,
        } => {
            let mut context = Context::new(Arc::new(DirResources::new(
                resources.unwrap_or_else(|| ".".into()),
            )));
            if let Some(assets) = assets {
                context = context.with_assets_dir(assets);
            }
            let sketch = Pixcache::new(Configuration::builder(context).build());

            let model = sketch
                .configuration()
                .uri_registry()
                .match_uri(&uri)
                .ok_or_else(|| PixError::UnsupportedUri(uri.clone()))?;
            println!("model: {}", model.name());
            if model.from_network() {
                println!("from: NETWORK (download it first to read the image)");
                return Ok(());
            }

            let source = sketch.data_source(&uri, None)?;
            let bytes = source.read_all()?;
            println!("from: {}", source.image_from());
            println!("length: {}", bytes.len());
            match ImageLoader::bounds(&bytes) {
                Ok(info) => println!("image: {info}"),
                Err(err) => println!("image: undecodable ({err})"),
            }
        }
    }

    Ok(())
}
