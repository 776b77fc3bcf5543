//! Selection octree: a spatial index over world-space bounds used to pick
//! culling candidates without walking every mesh

use crate::frustum::{points_in_frustum, FrustumPlanes};
use glam::Vec3;

pub const DEFAULT_MAX_CAPACITY: usize = 64;
pub const DEFAULT_MAX_DEPTH: usize = 2;

#[derive(Debug, Clone)]
struct OctreeEntry<T> {
    item: T,
    min: Vec3,
    max: Vec3,
}

#[derive(Debug, Clone)]
struct OctreeBlock<T> {
    min: Vec3,
    max: Vec3,
    depth: usize,
    entries: Vec<OctreeEntry<T>>,
    children: Vec<OctreeBlock<T>>,
}

impl<T: Copy + PartialEq> OctreeBlock<T> {
    fn new(min: Vec3, max: Vec3, depth: usize) -> Self {
        Self {
            min,
            max,
            depth,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    fn overlaps(&self, min: Vec3, max: Vec3) -> bool {
        self.max.cmpge(min).all() && self.min.cmple(max).all()
    }

    fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    fn add(&mut self, entry: &OctreeEntry<T>, capacity: usize, max_depth: usize) {
        if !self.overlaps(entry.min, entry.max) {
            return;
        }
        if !self.children.is_empty() {
            for child in &mut self.children {
                child.add(entry, capacity, max_depth);
            }
            return;
        }
        self.entries.push(entry.clone());
        if self.entries.len() > capacity && self.depth < max_depth {
            self.children = subdivide(self.min, self.max, self.depth + 1);
            for moved in std::mem::take(&mut self.entries) {
                for child in &mut self.children {
                    child.add(&moved, capacity, max_depth);
                }
            }
        }
    }

    fn select(&self, planes: &FrustumPlanes, out: &mut Vec<T>) {
        if !points_in_frustum(&self.corners(), planes) {
            return;
        }
        if self.children.is_empty() {
            for entry in &self.entries {
                if !out.contains(&entry.item) {
                    out.push(entry.item);
                }
            }
        } else {
            for child in &self.children {
                child.select(planes, out);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len() + self.children.iter().map(Self::len).sum::<usize>()
    }
}

fn subdivide<T: Copy + PartialEq>(min: Vec3, max: Vec3, depth: usize) -> Vec<OctreeBlock<T>> {
    let half = (max - min) * 0.5;
    let mut blocks = Vec::with_capacity(8);
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                let offset = Vec3::new(x as f32, y as f32, z as f32) * half;
                let block_min = min + offset;
                blocks.push(OctreeBlock::new(block_min, block_min + half, depth));
            }
        }
    }
    blocks
}

/// Octree over items with axis-aligned world bounds
#[derive(Debug, Clone)]
pub struct SelectionOctree<T> {
    max_capacity: usize,
    max_depth: usize,
    blocks: Vec<OctreeBlock<T>>,
}

impl<T: Copy + PartialEq> SelectionOctree<T> {
    pub fn new(max_capacity: usize, max_depth: usize) -> Self {
        Self {
            max_capacity: max_capacity.max(1),
            max_depth,
            blocks: Vec::new(),
        }
    }

    /// Rebuild over `world_min..world_max` with the given items
    pub fn update(&mut self, world_min: Vec3, world_max: Vec3, items: impl IntoIterator<Item = (T, Vec3, Vec3)>) {
        self.blocks = subdivide(world_min, world_max, 0);
        for (item, min, max) in items {
            let entry = OctreeEntry { item, min, max };
            for block in &mut self.blocks {
                block.add(&entry, self.max_capacity, self.max_depth);
            }
        }
    }

    /// Items in blocks that intersect the frustum, each once, in discovery order
    pub fn select(&self, planes: &FrustumPlanes) -> Vec<T> {
        let mut out = Vec::new();
        for block in &self.blocks {
            block.select(planes, &mut out);
        }
        out
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Stored entries, counting items once per leaf they landed in
    pub fn entry_count(&self) -> usize {
        self.blocks.iter().map(OctreeBlock::len).sum()
    }
}
