//! `grid` command: print tile ids, centers and texture rectangles.

use panotile::coord::TileGrid;

use crate::error::CliError;

pub fn run(rows: usize, cols: usize) -> Result<(), CliError> {
    let grid = TileGrid::new(rows, cols)?;

    println!("{}x{} grid, {} tiles", grid.rows(), grid.cols(), grid.len());
    println!();
    println!(
        "{:>5}  {:>4}  {:>4}  {:>15}  {:>27}",
        "tile", "row", "col", "center (x, y)", "texture (x, y, w, h)"
    );

    for (id, center) in grid.iter() {
        let Some((row, col)) = grid.position(id) else {
            continue;
        };
        let Some(rect) = grid.texture_rect(id) else {
            continue;
        };
        println!(
            "{:>5}  {:>4}  {:>4}  ({:>5.3}, {:>5.3})  ({:.3}, {:.3}, {:.3}, {:.3})",
            id.index(),
            row,
            col,
            center.x,
            center.y,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }

    Ok(())
}
