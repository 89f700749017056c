#[repr(C)] // tightly packed xyz, matches the Float32x3 attribute layout
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

pub const FLOATS_PER_VERTEX: u32 = 3;

pub const PENTAGON_VERTICES: &[Vertex] = &[
    Vertex {
        position: [0.0, 0.5, 0.0],
    }, // top
    Vertex {
        position: [-0.47, 0.15, 0.0],
    }, // top-left
    Vertex {
        position: [-0.29, -0.4, 0.0],
    }, // bottom-left
    Vertex {
        position: [0.29, -0.4, 0.0],
    }, // bottom-right
    Vertex {
        position: [0.47, 0.15, 0.0],
    }, // top-right
];

/// The pentagon as the flat float array handed to the vertex buffer.
pub fn pentagon_positions() -> &'static [f32] {
    bytemuck::cast_slice(PENTAGON_VERTICES)
}

/// Lowers a triangle fan over `first..first + count` to a triangle list.
///
/// Every triangle shares the fan's first vertex. Fewer than three vertices
/// produce no triangles.
pub fn fan_indices(first: u32, count: u32) -> Vec<u32> {
    if count < 3 {
        return Vec::new();
    }

    (1..count - 1)
        .flat_map(|i| [first, first + i, first + i + 1])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pentagon_has_five_flat_points() {
        assert_eq!(PENTAGON_VERTICES.len(), 5);
        assert!(PENTAGON_VERTICES.iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn positions_are_the_literal_coordinates() {
        let expected: [f32; 15] = [
            0.0, 0.5, 0.0, //
            -0.47, 0.15, 0.0, //
            -0.29, -0.4, 0.0, //
            0.29, -0.4, 0.0, //
            0.47, 0.15, 0.0,
        ];
        assert_eq!(pentagon_positions(), &expected[..]);
    }

    #[test]
    fn pentagon_is_centered_on_the_origin() {
        let positions = pentagon_positions();
        let sum_x: f32 = positions.chunks(3).map(|p| p[0]).sum();
        assert!(sum_x.abs() < 1e-6);
    }

    #[test]
    fn fan_over_five_vertices_is_three_triangles() {
        assert_eq!(fan_indices(0, 5), vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn fan_respects_first_vertex() {
        assert_eq!(fan_indices(2, 4), vec![2, 3, 4, 2, 4, 5]);
    }

    #[test]
    fn degenerate_fans_are_empty() {
        assert!(fan_indices(0, 0).is_empty());
        assert!(fan_indices(0, 2).is_empty());
        assert_eq!(fan_indices(0, 3), vec![0, 1, 2]);
    }
}
