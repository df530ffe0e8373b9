/// an axis-aligned rectangle footprint, in cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
}

impl Shape {
    #[inline]
    pub fn area(self) -> usize {
        self.width * self.height
    }
}

/// every admissible slice footprint for a `(min_per_label, max_area)` pair.
///
/// a shape is admissible when `2 * min_per_label <= area <= max_area`: the
/// area floor is necessary for the content constraint to be satisfiable
/// (each of the two labels needs `min_per_label` cells), the ceiling is the
/// hard size limit. built once per run and shared read-only by every
/// partition; placements refer to shapes by index into this list.
#[derive(Clone, Debug)]
pub struct SliceCatalog {
    shapes: Vec<Shape>,
}

impl SliceCatalog {
    pub fn generate(min_per_label: usize, max_area: usize) -> SliceCatalog {
        let floor = 2 * min_per_label;

        let mut shapes = Vec::new();
        for height in 1..=max_area {
            let start = (floor.div_ceil(height)).max(1);
            for width in start..=max_area {
                if width * height > max_area {
                    break;
                }
                shapes.push(Shape { width, height });
            }
        }

        SliceCatalog { shapes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[inline]
    pub fn get(&self, k: usize) -> Shape {
        self.shapes[k]
    }

    #[inline]
    pub fn try_get(&self, k: usize) -> Option<Shape> {
        self.shapes.get(k).copied()
    }

    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_brute_force() {
        for min_per_label in 1..=4 {
            for max_area in 1..=14 {
                let catalog = SliceCatalog::generate(min_per_label, max_area);

                let mut expected = Vec::new();
                for height in 1..=max_area {
                    for width in 1..=max_area {
                        let area = width * height;
                        if area >= 2 * min_per_label && area <= max_area {
                            expected.push(Shape { width, height });
                        }
                    }
                }

                let mut got = catalog.shapes().to_vec();
                got.sort_by_key(|s| (s.height, s.width));
                expected.sort_by_key(|s| (s.height, s.width));
                assert_eq!(got, expected, "L={min_per_label} H={max_area}");
            }
        }
    }

    #[test]
    fn test_all_shapes_within_bounds() {
        let catalog = SliceCatalog::generate(2, 12);
        for shape in catalog.shapes() {
            assert!(shape.area() >= 4);
            assert!(shape.area() <= 12);
        }
    }

    #[test]
    fn test_infeasible_parameters_yield_empty_catalog() {
        // max_area below 2 * min_per_label leaves nothing admissible
        let catalog = SliceCatalog::generate(3, 5);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_single_shape_catalog() {
        // L=1, H=2: only the two dominoes fit between the bounds
        let catalog = SliceCatalog::generate(1, 2);
        let mut got = catalog.shapes().to_vec();
        got.sort_by_key(|s| (s.height, s.width));
        assert_eq!(
            got,
            vec![
                Shape {
                    width: 2,
                    height: 1
                },
                Shape {
                    width: 1,
                    height: 2
                },
            ]
        );
    }
}
