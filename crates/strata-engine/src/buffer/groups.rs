/// A sub-range of a bucket's vertex and element buffers drawable in one call.
///
/// Indices stored in the element buffer are relative to `vertex_start_index`,
/// so a group never addresses more than [`ElementGroup::MAX_VERTICES`] vertices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ElementGroup {
    pub vertex_start_index: u32,
    pub vertex_length: u32,
    /// First triangle (not first index) in the element buffer.
    pub element_start_index: u32,
    /// Number of triangles.
    pub element_length: u32,
}

impl ElementGroup {
    /// Largest vertex count addressable with 16-bit indices.
    pub const MAX_VERTICES: u32 = u16::MAX as u32;

    #[inline]
    pub const fn new(vertex_start_index: u32, element_start_index: u32) -> Self {
        Self {
            vertex_start_index,
            vertex_length: 0,
            element_start_index,
            element_length: 0,
        }
    }

    /// First index into the element buffer (three per triangle).
    #[inline]
    pub const fn first_index(&self) -> u32 {
        self.element_start_index * 3
    }

    /// Number of indices to draw (three per triangle).
    #[inline]
    pub const fn index_count(&self) -> u32 {
        self.element_length * 3
    }
}

/// Ordered element groups for one geometry kind of a bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementGroupTable {
    groups: Vec<ElementGroup>,
}

impl ElementGroupTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: Vec<ElementGroup>) -> Self {
        debug_assert!(groups.iter().all(|g| g.vertex_length <= ElementGroup::MAX_VERTICES));
        Self { groups }
    }

    #[inline]
    pub fn groups(&self) -> &[ElementGroup] {
        &self.groups
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Ensures the current group can take `num_vertices` more vertices.
    ///
    /// Opens a new group starting at the buffers' current record indices when
    /// there is no group yet or the current one would overflow 16-bit indices.
    /// Returns the group the caller should extend.
    pub fn make_room_for(
        &mut self,
        num_vertices: u32,
        vertex_index: u32,
        element_index: u32,
    ) -> &mut ElementGroup {
        let needs_new = match self.groups.last() {
            None => true,
            Some(g) => g.vertex_length + num_vertices > ElementGroup::MAX_VERTICES,
        };
        if needs_new {
            self.groups.push(ElementGroup::new(vertex_index, element_index));
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }
}

impl<'a> IntoIterator for &'a ElementGroupTable {
    type Item = &'a ElementGroup;
    type IntoIter = std::slice::Iter<'a, ElementGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}
