use cgmath::*;

/// Accumulated rotation in degrees.
///
/// The angle is never wrapped back into `0..360`; only its sine and cosine
/// are ever used, so unbounded growth is harmless.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RotationState {
    degrees: f64,
}

impl RotationState {
    pub fn new(degrees: f64) -> Self {
        Self { degrees }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn advance(&mut self, step: f64) {
        self.degrees += step;
    }

    pub fn model_matrix(&self) -> ModelMatrix {
        ModelMatrix::rotation_z(self.degrees)
    }
}

/// Per-frame model transform: a rotation about z in homogeneous coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMatrix(Matrix4<f32>);

impl ModelMatrix {
    /// Builds the standard counter-clockwise rotation for `degrees`.
    pub fn rotation_z(degrees: f64) -> Self {
        let Rad(radians) = Rad::from(Deg(degrees));
        let (sin_b, cos_b) = radians.sin_cos();
        let (sin_b, cos_b) = (sin_b as f32, cos_b as f32);

        // cgmath takes columns: column 0 is the image of +x, column 1 of +y
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            cos_b,  sin_b, 0.0, 0.0,
            -sin_b, cos_b, 0.0, 0.0,
            0.0,    0.0,   1.0, 0.0,
            0.0,    0.0,   0.0, 1.0,
        );
        Self(matrix)
    }

    #[cfg(test)]
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Element at mathematical `(row, col)`.
    #[cfg(test)]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[col][row]
    }

    /// Column-major layout, ready to upload as a WGSL `mat4x4<f32>`.
    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.0.into()
    }
}

#[cfg(test)]
impl From<ModelMatrix> for Matrix4<f32> {
    fn from(matrix: ModelMatrix) -> Self {
        matrix.0
    }
}
