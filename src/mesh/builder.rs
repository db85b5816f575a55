/// Material slots shared by every object in a file
pub const MAT_UNLIT: usize = 0;
pub const MAT_LIT: usize = 1;

/// One polygon: node indices with texture coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub refs: Vec<(usize, f64, f64)>,
    pub material: usize,
}

/// A textured polygon mesh
///
/// Nodes are in local metres relative to the owning cluster origin, with `z`
/// up. Axis conversion happens only when writing.
#[derive(Debug, Clone, Default)]
pub struct AcObject {
    pub name: String,
    pub texture: Option<String>,
    nodes: Vec<[f64; 3]>,
    faces: Vec<Face>,
}

impl AcObject {
    pub fn new(name: impl Into<String>, texture: Option<String>) -> Self {
        Self {
            name: name.into(),
            texture,
            nodes: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Add a node and return its index
    pub fn node(&mut self, x: f64, y: f64, z: f64) -> usize {
        self.nodes.push([x, y, z]);
        self.nodes.len() - 1
    }

    pub fn face(&mut self, refs: &[(usize, f64, f64)], material: usize) {
        self.faces.push(Face {
            refs: refs.to_vec(),
            material,
        });
    }

    /// Add a quad from four (index, u, v) corners
    pub fn quad(&mut self, corners: [(usize, f64, f64); 4], material: usize) {
        self.face(&corners, material);
    }

    pub fn nodes(&self) -> &[[f64; 3]] {
        &self.nodes
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub(crate) fn retain_faces(&mut self, keep: impl FnMut(&Face) -> bool) {
        self.faces.retain(keep);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Accumulator for the objects of one output file
#[derive(Debug, Default)]
pub struct AcFile {
    objects: Vec<AcObject>,
}

impl AcFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new object and hand back a handle to fill it
    pub fn new_object(&mut self, name: impl Into<String>, texture: Option<String>) -> &mut AcObject {
        self.objects.push(AcObject::new(name, texture));
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn objects(&self) -> &[AcObject] {
        &self.objects
    }

    pub fn face_count(&self) -> usize {
        self.objects.iter().map(AcObject::face_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.iter().all(AcObject::is_empty)
    }
}
