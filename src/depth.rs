//! # Depth Grid Module
//!
//! Serialises a depth raster into a text grid of distances in metres, one line per image row,
//! values separated by `", "` and printed with two decimal places.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::Write;

use crate::frame::DepthImage;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Separator placed between two values of a row.
pub const SEPARATOR: &str = ", ";

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Lazily produce the rows of the grid, top to bottom, without the trailing newline.
pub fn rows(depth: &DepthImage) -> impl Iterator<Item = String> + '_ {
    depth.data.outer_iter().map(move |row| {
        let mut line = String::with_capacity(row.len() * 6);
        for (x, raw) in row.iter().enumerate() {
            if x > 0 {
                line.push_str(SEPARATOR);
            }
            line.push_str(&format!("{:.2}", *raw as f32 * depth.depth_units));
        }
        line
    })
}

/// Write the whole grid into `sink`.
pub fn write_grid<W: Write>(depth: &DepthImage, sink: &mut W) -> std::io::Result<()> {
    for row in rows(depth) {
        writeln!(sink, "{}", row)?;
    }

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_grid_shape_matches_image() {
        let depth = DepthImage::new(Array2::from_elem((3, 5), 1234), 0.001);

        let rows = rows(&depth).collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);
        for row in rows {
            let values = row.split(SEPARATOR).collect::<Vec<_>>();
            assert_eq!(values.len(), 5);
            assert!(values.iter().all(|v| *v == "1.23"));
        }
    }

    #[test]
    fn test_values_run_left_to_right() {
        let data = Array2::from_shape_vec((2, 2), vec![0, 500, 1000, 2560]).unwrap();
        let depth = DepthImage::new(data, 0.001);

        let mut out = Vec::new();
        write_grid(&depth, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0.00, 0.50\n1.00, 2.56\n");
    }

    #[test]
    fn test_empty_image_has_no_rows() {
        let depth = DepthImage::new(Array2::zeros((0, 4)), 0.001);
        assert_eq!(rows(&depth).count(), 0);
    }
}
