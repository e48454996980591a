//! Editable control-node topology of a road
//!
//! Nodes follow the pattern anchor, control, control, anchor, control, ...
//! An open road holds `3k + 1` nodes, a ring road holds `3k` nodes where the
//! last two are the handles bridging the final anchor back to the first.
//! Adjacent-index lookups wrap on ring roads and are skipped on open roads.

use glam::Vec3;
use log::{debug, warn};

use super::error::{RoadError, RoadResult};
use super::ray::Ray;
use super::types::{is_anchor, SEED_HANDLE_OFFSET, SEED_ROAD_HALF_LENGTH};

/// Ordered control nodes plus the ring-road flag
#[derive(Debug, Clone, PartialEq)]
pub struct RoadTopology {
    nodes: Vec<Vec3>,
    is_ring_road: bool,
}

impl RoadTopology {
    /// Straight single-section road along the X axis around `center`
    pub fn seeded(center: Vec3) -> Self {
        Self {
            nodes: vec![
                center + Vec3::NEG_X * SEED_ROAD_HALF_LENGTH,
                center + Vec3::NEG_X * SEED_HANDLE_OFFSET,
                center + Vec3::X * SEED_HANDLE_OFFSET,
                center + Vec3::X * SEED_ROAD_HALF_LENGTH,
            ],
            is_ring_road: false,
        }
    }

    /// Build an open road from an explicit node list
    pub fn from_nodes(nodes: Vec<Vec3>) -> RoadResult<Self> {
        if nodes.len() < 4 || nodes.len() % 3 != 1 {
            return Err(RoadError::InvalidIndex {
                index: nodes.len(),
                len: nodes.len(),
            });
        }
        Ok(Self {
            nodes,
            is_ring_road: false,
        })
    }

    pub fn nodes(&self) -> &[Vec3] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<Vec3> {
        self.nodes.get(index).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn section_count(&self) -> usize {
        self.nodes.len() / 3
    }

    pub fn is_ring_road(&self) -> bool {
        self.is_ring_road
    }

    /// Indices of all anchor nodes
    pub fn anchor_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).step_by(3)
    }

    /// Wraps an index around the node list
    fn wrap(&self, index: isize) -> usize {
        index.rem_euclid(self.nodes.len() as isize) as usize
    }

    /// Resolves a neighbour index: wrapped on ring roads, `None` past the
    /// ends of an open road
    fn neighbour(&self, index: isize) -> Option<usize> {
        if self.is_ring_road {
            Some(self.wrap(index))
        } else if index >= 0 && (index as usize) < self.nodes.len() {
            Some(index as usize)
        } else {
            None
        }
    }

    /// The four nodes of a section, the final anchor wraps on ring roads
    pub fn section(&self, section_index: usize) -> Option<[Vec3; 4]> {
        if section_index >= self.section_count() {
            return None;
        }
        let start = section_index * 3;
        Some([
            self.nodes[start],
            self.nodes[start + 1],
            self.nodes[start + 2],
            self.nodes[self.wrap(start as isize + 3)],
        ])
    }

    /// Iterate all sections in order
    pub fn sections(&self) -> impl Iterator<Item = [Vec3; 4]> + '_ {
        (0..self.section_count()).filter_map(|i| self.section(i))
    }

    /// Appends a section ending at `anchor`
    ///
    /// The first new handle mirrors the previous handle through the last
    /// anchor so the tangent stays continuous, the second sits halfway
    /// between that handle and the new anchor. On ring roads the section is
    /// inserted before the closing handles, which keep their shape.
    pub fn create_section(&mut self, anchor: Vec3) {
        if self.is_ring_road {
            let closing_in = self.nodes.pop();
            let closing_out = self.nodes.pop();
            if let (Some(handle_out), Some(handle_in)) = (closing_out, closing_in) {
                self.nodes.push(handle_out);
                self.nodes.push((handle_out + anchor) * 0.5);
                self.nodes.push(anchor);
                let len = self.nodes.len();
                let mirrored = self.nodes[len - 1] * 2.0 - self.nodes[len - 2];
                self.nodes.push(mirrored);
                self.nodes.push(handle_in);
            }
        } else {
            let len = self.nodes.len();
            let control = self.nodes[len - 1] * 2.0 - self.nodes[len - 2];
            self.nodes.push(control);
            self.nodes.push((control + anchor) * 0.5);
            self.nodes.push(anchor);
        }
        debug!(
            "Created road section ending at ({:.2}, {:.2}, {:.2}), {} sections",
            anchor.x,
            anchor.y,
            anchor.z,
            self.section_count()
        );
    }

    /// Creates a section where `ray` meets the horizontal plane through the
    /// reference node (the selected node, or the last node)
    ///
    /// Returns `false` when the ray never reaches that plane.
    pub fn create_section_from_ray(&mut self, ray: &Ray, selected_node: Option<usize>) -> bool {
        let reference = selected_node
            .and_then(|index| self.node(index))
            .unwrap_or(self.nodes[self.nodes.len() - 1]);

        match ray.intersect_horizontal_plane(reference.y) {
            Some(anchor) => {
                self.create_section(anchor);
                true
            }
            None => false,
        }
    }

    /// Removes the anchor at `anchor_index` together with a pair of handles
    ///
    /// A ring road keeps at least two sections and an open road at least one;
    /// requests that would go below that, or that do not name an anchor, are
    /// ignored and return `false`.
    pub fn remove_section(&mut self, anchor_index: usize) -> bool {
        if anchor_index >= self.nodes.len() || !is_anchor(anchor_index) {
            warn!(
                "Ignoring section removal: node {} is not an anchor of a {}-node road",
                anchor_index,
                self.nodes.len()
            );
            return false;
        }

        let sections = self.section_count();
        if !(sections > 2 || (!self.is_ring_road && sections > 1)) {
            debug!("Ignoring section removal: road has only {} sections", sections);
            return false;
        }

        let len = self.nodes.len();
        if anchor_index == 0 {
            if self.is_ring_road {
                self.nodes[len - 1] = self.nodes[2];
            }
            self.nodes.drain(0..3);
        } else if anchor_index == len - 1 && !self.is_ring_road {
            self.nodes.drain(anchor_index - 2..=anchor_index);
        } else {
            self.nodes.drain(anchor_index - 1..=anchor_index + 1);
        }
        true
    }

    /// Hit-tests the nodes and removes the section if an anchor was hit
    pub fn remove_section_at_ray(
        &mut self,
        ray: &Ray,
        anchor_hit_radius: f32,
        control_hit_radius: f32,
    ) -> bool {
        match self.select_node(ray, anchor_hit_radius, control_hit_radius) {
            Some(index) if is_anchor(index) => self.remove_section(index),
            _ => false,
        }
    }

    /// Inserts a new anchor halfway between the anchor at `node_index` and
    /// the next anchor (wrapping on ring roads)
    ///
    /// The new handles sit at a quarter and three quarters of the way between
    /// the two original anchors, so they follow the chord rather than the
    /// old curve and the split section may bend differently afterwards.
    /// Returns the index of the inserted anchor.
    pub fn split_section(&mut self, node_index: usize) -> Option<usize> {
        if node_index >= self.nodes.len() || !is_anchor(node_index) {
            warn!(
                "Ignoring section split: node {} is not an anchor of a {}-node road",
                node_index,
                self.nodes.len()
            );
            return None;
        }

        let next_anchor = if node_index + 3 < self.nodes.len() {
            self.nodes[node_index + 3]
        } else if self.is_ring_road {
            self.nodes[0]
        } else {
            debug!("Ignoring section split: node {} is the last anchor", node_index);
            return None;
        };

        let start = self.nodes[node_index];
        let insert_at = self.wrap(node_index as isize + 2);
        self.nodes.splice(
            insert_at..insert_at,
            [
                start.lerp(next_anchor, 0.25),
                start.lerp(next_anchor, 0.5),
                start.lerp(next_anchor, 0.75),
            ],
        );
        Some(node_index + 3)
    }

    /// Moves a node, keeping the curve smooth around it
    ///
    /// Moving an anchor drags its adjacent handles by the same offset. Moving
    /// a handle swings its paired handle on the other side of the shared
    /// anchor to point the opposite way, keeping that handle's length.
    pub fn move_node(&mut self, node_index: usize, new_position: Vec3) -> bool {
        if node_index >= self.nodes.len() {
            warn!(
                "Ignoring node move: index {} out of range for {} nodes",
                node_index,
                self.nodes.len()
            );
            return false;
        }

        let movement = new_position - self.nodes[node_index];
        self.nodes[node_index] = new_position;
        let index = node_index as isize;

        if is_anchor(node_index) {
            for adjacent in [index + 1, index - 1] {
                if let Some(adjacent) = self.neighbour(adjacent) {
                    self.nodes[adjacent] += movement;
                }
            }
        } else {
            let next_is_anchor = (node_index + 1) % 3 == 0;
            let (paired, anchor) = if next_is_anchor {
                (index + 2, index + 1)
            } else {
                (index - 2, index - 1)
            };

            if let (Some(paired), Some(anchor)) = (self.neighbour(paired), self.neighbour(anchor)) {
                let anchor_position = self.nodes[anchor];
                let distance = anchor_position.distance(self.nodes[paired]);
                if let Some(direction) = (anchor_position - new_position).try_normalize() {
                    self.nodes[paired] = anchor_position + direction * distance;
                }
            }
        }
        true
    }

    /// Opens or closes the road loop, returns whether anything changed
    pub fn set_ring_road(&mut self, value: bool) -> bool {
        if self.is_ring_road == value {
            return false;
        }
        self.is_ring_road = value;

        let len = self.nodes.len();
        if value {
            let handle_out = self.nodes[len - 1] * 2.0 - self.nodes[len - 2];
            let handle_in = self.nodes[0] * 2.0 - self.nodes[1];
            self.nodes.push(handle_out);
            self.nodes.push(handle_in);
        } else {
            self.nodes.truncate(len - 2);
        }
        true
    }

    /// First node (in index order) whose pick sphere the ray passes through
    pub fn select_node(&self, ray: &Ray, anchor_radius: f32, control_radius: f32) -> Option<usize> {
        self.nodes.iter().enumerate().find_map(|(index, node)| {
            let radius = if is_anchor(index) {
                anchor_radius
            } else {
                control_radius
            };
            ray.intersects_sphere(*node, radius).then_some(index)
        })
    }
}
