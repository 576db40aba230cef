//! Print the placement grid for one source.

use convulse_scene_model::{placement, PositionIndex, SizeFraction, POSITION_COUNT};

pub fn run(aspect: f64, size: f64, width: u32, height: u32) -> anyhow::Result<()> {
    let size = SizeFraction::new(size)
        .ok_or_else(|| anyhow::anyhow!("Size must be a finite number, got {size}"))?;

    println!("Canvas {width}x{height}, aspect {aspect:.3}, size {size}");
    println!("{}", "=".repeat(50));
    for index in 0..u32::from(POSITION_COUNT) {
        let position = PositionIndex::new(index);
        match placement(aspect, size, position, width, height) {
            Some(p) => println!(
                "  [{index}] row {} col {}: x={:.1} y={:.1} {:.1}x{:.1}",
                position.row(),
                position.col(),
                p.x,
                p.y,
                p.width,
                p.height
            ),
            None => println!("  [{index}] not drawn (aspect ratio is not finite)"),
        }
    }
    Ok(())
}
