use bbox_viz::history::{plot_history, History, LEARNING_RATES, LOSS, VAL_LOSS};
use bbox_viz::{BoundingBox, LabelNames, RenderConfig, Renderer};
use image::{Rgb, RgbImage};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let out_dir = std::env::temp_dir().join("bbox-viz-demo");
    let config = RenderConfig {
        output_dir: out_dir.clone(),
        ..RenderConfig::default()
    };
    let mut renderer = Renderer::new(config)?;

    let image = RgbImage::from_fn(320, 240, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let names: LabelNames = [("0", "cat"), ("1", "dog")].into_iter().collect();
    let truth = vec![
        BoundingBox::new(20.0, 30.0, 140.0, 200.0, 0u32),
        BoundingBox::new(170.0, 60.0, 300.0, 220.0, 1u32),
    ];
    let predicted = vec![
        BoundingBox::new(25.0, 28.0, 150.0, 190.0, 0u32),
        BoundingBox::new(0.0, 0.0, 0.0, 0.0, 1u32),
    ];

    println!("rendering annotations...");
    renderer.render_single(
        &image,
        &predicted,
        &names,
        Some(&[0.91, 0.0]),
        Some("predictions"),
        Some(&out_dir.join("single.png")),
    )?;

    let tensor = renderer.render_comparison(&image, &truth, &predicted, &[0.91, 0.0], &names)?;
    println!("comparison tensor {:?}", tensor.shape());

    let history: History = [
        (LOSS, vec![1.2, 0.8, 0.55, 0.41, 0.36]),
        (VAL_LOSS, vec![1.3, 0.95, 0.74, 0.7, 0.69]),
        (LEARNING_RATES, vec![1e-3, 1e-3, 5e-4, 2.5e-4, 1.25e-4]),
    ]
    .into_iter()
    .collect();
    let charts = plot_history(&history, Some(&out_dir), false)?;
    println!("wrote {} chart(s) to {}", charts.len(), out_dir.display());
    Ok(())
}
