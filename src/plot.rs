//! Sample image and cost curve output.

use crate::dataset::SignsDataset;
use crate::error::{Result, SignsError};
use image::{GrayImage, RgbImage};
use plotters::prelude::*;
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SignsError::io(parent, e))?;
    }
    Ok(())
}

fn plot_err<E: std::fmt::Display>(e: E) -> SignsError {
    SignsError::Plot(e.to_string())
}

/// Save one dataset image, unscaled, as a PNG.
pub fn save_sample_image(dataset: &SignsDataset, index: usize, path: &Path) -> Result<()> {
    if index >= dataset.len() {
        return Err(SignsError::Plot(format!(
            "sample index {} out of range for {} images",
            index,
            dataset.len()
        )));
    }
    ensure_parent(path)?;

    let shape = dataset.shape;
    let (w, h) = (shape.width as u32, shape.height as u32);
    let pixels = dataset.image(index).to_vec();
    match shape.channels {
        3 => RgbImage::from_raw(w, h, pixels)
            .ok_or_else(|| plot_err("image buffer too small"))?
            .save(path)?,
        1 => GrayImage::from_raw(w, h, pixels)
            .ok_or_else(|| plot_err("image buffer too small"))?
            .save(path)?,
        c => return Err(plot_err(format!("cannot render a {}-channel image", c))),
    }
    Ok(())
}

/// Draw the per-epoch cost history as an SVG line chart.
pub fn save_cost_curve(costs: &[f32], learning_rate: f32, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let root = SVGBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let y_max = costs
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(0.0f32, f32::max)
        .max(f32::EPSILON)
        * 1.05;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Learning rate ={}", learning_rate), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..costs.len().max(1), 0f32..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("iterations (per tens)")
        .y_desc("cost")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            costs.iter().enumerate().map(|(i, &c)| (i, c)),
            &BLUE,
        ))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::InputShape;

    #[test]
    fn test_sample_index_out_of_range() {
        let ds = SignsDataset {
            shape: InputShape::new(1, 1, 3),
            images: vec![0, 0, 0],
            labels: vec![0],
        };
        let err = save_sample_image(&ds, 1, Path::new("unused.png")).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
