//! Patch composition with graph-cut seam optimization.
//!
//! Every pixel of the canvas remembers which placed patch it came from.
//! When a new patch lands on already-covered ground, a minimum s-t cut over
//! the overlap decides, pixel by pixel, whether the old source or the new
//! patch wins. Seams that survive a cut keep their cost in later cuts
//! through dedicated seam nodes, so the boundary can be relocated instead
//! of paid twice.

use std::rc::Rc;

use log::trace;

use crate::errors::Error;
use crate::graph::{FlowGraph, INF_FLOW};
use crate::texture::{Pixel, Texture};

/// Compact handle of a placed patch inside the canvas arena. Patch equality
/// is identity: two placements of the same texture at the same offset are
/// still distinct patches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatchId(u32);

/// A texture positioned in canvas space. The patch may extend past the
/// canvas bounds; the canvas clips internally.
#[derive(Clone)]
pub struct Patch {
    source: Rc<Texture>,
    x: i32,
    y: i32,
}

impl Patch {
    pub fn new(source: Rc<Texture>, x: i32, y: i32) -> Self {
        Self { source, x, y }
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn x_end(&self) -> i32 {
        self.x + self.source.width() as i32
    }

    #[inline]
    pub fn y_end(&self) -> i32 {
        self.y + self.source.height() as i32
    }

    /// Whether the canvas coordinate lies inside this patch's extent.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x_end() && y >= self.y && y < self.y_end()
    }

    /// Source pixel at a canvas coordinate. The coordinate must be inside
    /// the extent.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Pixel {
        self.source.pixel((x - self.x) as u32, (y - self.y) as u32)
    }
}

const NO_OVERLAP: u32 = u32::MAX;

/// The synthesis target: an image plus, per pixel, the patch it was taken
/// from. Unassigned pixels hold meaningless color data.
pub struct Canvas {
    image: Texture,
    origin: Vec<Option<PatchId>>,
    patches: Vec<Patch>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Texture::new(width, height),
            origin: vec![None; (width as usize) * (height as usize)],
            patches: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.image.pixel(x, y)
    }

    pub fn texture(&self) -> &Texture {
        &self.image
    }

    pub fn into_texture(self) -> Texture {
        self.image
    }

    pub fn origin_of(&self, x: u32, y: u32) -> Option<PatchId> {
        self.origin[(y as usize) * (self.width() as usize) + x as usize]
    }

    pub fn patch(&self, id: PatchId) -> &Patch {
        &self.patches[id.0 as usize]
    }

    pub fn assigned_count(&self) -> usize {
        self.origin.iter().filter(|o| o.is_some()).count()
    }

    /// Whether every pixel has been assigned a source patch.
    pub fn is_complete(&self) -> bool {
        self.origin.iter().all(|o| o.is_some())
    }

    /// Composites `patch` onto the canvas. Unassigned pixels under the
    /// patch adopt it outright; already-assigned pixels are re-decided by a
    /// minimum cut over the overlap region.
    pub fn apply(&mut self, patch: Patch) {
        let id = PatchId(self.patches.len() as u32);
        let w = self.width() as i32;
        let h = self.height() as i32;
        let x0 = patch.x().max(0);
        let y0 = patch.y().max(0);
        let x1 = patch.x_end().min(w);
        let y1 = patch.y_end().min(h);
        self.patches.push(patch);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let patch = self.patches[id.0 as usize].clone();

        // Classification: fill unassigned pixels, collect the overlap in
        // scan order, and pre-count seam nodes for pre-existing seams. The
        // count is an upper bound; surplus nodes simply stay edgeless.
        let mut overlap: Vec<(i32, i32, PatchId)> = Vec::new();
        let mut overlap_index = vec![NO_OVERLAP; (w as usize) * (h as usize)];
        let mut old_seam_bound = 0usize;
        let mut fresh = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let i = (y * w + x) as usize;
                match self.origin[i] {
                    None => {
                        self.origin[i] = Some(id);
                        self.image.set(x as u32, y as u32, patch.pixel(x, y));
                        fresh += 1;
                    }
                    Some(r) => {
                        overlap_index[i] = overlap.len() as u32;
                        overlap.push((x, y, r));
                        for &(dx, dy) in &[(0, 1), (1, 0)] {
                            let (a, b) = (x + dx, y + dy);
                            if a < w && b < h {
                                if let Some(q) = self.origin[(b * w + a) as usize] {
                                    if q != r {
                                        old_seam_bound += 1;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        if overlap.is_empty() {
            trace!(
                "patch {:?} at ({}, {}): {} fresh pixels, no overlap",
                id,
                patch.x(),
                patch.y(),
                fresh
            );
            return;
        }

        // Graph layout: overlap pixels, then seam nodes, then s and t.
        let s = overlap.len() + old_seam_bound;
        let t = s + 1;
        let mut graph = FlowGraph::new(t + 1);
        let mut seam_cursor = overlap.len();

        for (i, &(x, y, r)) in overlap.iter().enumerate() {
            let m_s = self.image.pixel(x as u32, y as u32).distance(patch.pixel(x, y));

            for (d, &(dx, dy)) in [(0, 1), (1, 0), (0, -1), (-1, 0)].iter().enumerate() {
                let (a, b) = (x + dx, y + dy);
                if a < 0 || b < 0 || a >= w || b >= h {
                    continue;
                }
                let ni = (b * w + a) as usize;
                let q = match self.origin[ni] {
                    Some(q) => q,
                    None => continue,
                };

                if q == id {
                    // Adjacent to ground the new patch claimed outright:
                    // this pixel is pulled towards the new patch.
                    graph.add_edge(i, t, INF_FLOW);
                } else if overlap_index[ni] == NO_OVERLAP {
                    // Adjacent to a kept region outside the overlap: this
                    // pixel anchors the old side of the cut.
                    graph.add_edge(s, i, INF_FLOW);
                } else if d < 2 {
                    // Inner seam link, forward directions only so each
                    // link is built once.
                    let j = overlap_index[ni] as usize;
                    let m_t = self
                        .image
                        .pixel(a as u32, b as u32)
                        .distance(patch.pixel(a, b));
                    let old = self.patch(r);
                    let new = self.patch(q);
                    if r != q
                        && old.contains(a, b)
                        && new.contains(a, b)
                        && new.contains(x, y)
                    {
                        // A pre-existing seam crosses this link: route it
                        // through a seam node carrying the old seam cost so
                        // the cut may relocate the boundary instead of
                        // stacking both costs.
                        let k = seam_cursor;
                        seam_cursor += 1;
                        let old_m_s = old.pixel(x, y).distance(new.pixel(x, y));
                        let old_m_t = old.pixel(a, b).distance(new.pixel(a, b));
                        graph.add_edge(k, i, m_s + m_t);
                        graph.add_edge(k, j, m_s + m_t);
                        graph.add_edge(k, t, old_m_s + old_m_t);
                    } else {
                        graph.add_edge(i, j, m_s + m_t);
                    }
                }
            }
        }

        let flow = graph.max_flow(s, t);
        let keep = graph.source_side(s);

        let mut taken = 0usize;
        for (i, &(x, y, _)) in overlap.iter().enumerate() {
            if !keep[i] {
                self.origin[(y * w + x) as usize] = Some(id);
                self.image.set(x as u32, y as u32, patch.pixel(x, y));
                taken += 1;
            }
        }

        trace!(
            "patch {:?} at ({}, {}): {} fresh, {} overlap ({} re-taken), {}/{} seam nodes, cut cost {}",
            id,
            patch.x(),
            patch.y(),
            fresh,
            overlap.len(),
            taken,
            seam_cursor - overlap.len(),
            old_seam_bound,
            flow
        );
    }

    /// Mean squared RGB distance between the patch and the already-assigned
    /// canvas pixels under it.
    pub fn ssd(&self, patch: &Patch) -> Result<u64, Error> {
        self.ssd_window(patch, 0, 0, self.width() as i32, self.height() as i32)
    }

    /// Same as [`ssd`](Self::ssd), restricted to a canvas-space window.
    pub fn ssd_window(
        &self,
        patch: &Patch,
        wx: i32,
        wy: i32,
        ww: i32,
        wh: i32,
    ) -> Result<u64, Error> {
        let w = self.width() as i32;
        let h = self.height() as i32;
        let x0 = patch.x().max(wx).max(0);
        let y0 = patch.y().max(wy).max(0);
        let x1 = patch.x_end().min(wx + ww).min(w);
        let y1 = patch.y_end().min(wy + wh).min(h);

        let mut sum = 0u64;
        let mut count = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.origin[(y * w + x) as usize].is_some() {
                    sum += self
                        .image
                        .pixel(x as u32, y as u32)
                        .distance_squared(patch.pixel(x, y));
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Err(Error::EmptyOverlap);
        }
        Ok(sum / count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sampler::Sampler;

    fn solid(width: u32, height: u32, pixel: Pixel) -> Rc<Texture> {
        let mut t = Texture::new(width, height);
        for y in 0..height {
            for x in 0..width {
                t.set(x, y, pixel);
            }
        }
        Rc::new(t)
    }

    fn gradient(width: u32, height: u32) -> Rc<Texture> {
        let mut t = Texture::new(width, height);
        for y in 0..height {
            for x in 0..width {
                t.set(x, y, Pixel::new((x * 37) as u8, (y * 53) as u8, 11));
            }
        }
        Rc::new(t)
    }

    /// Every assigned pixel holds exactly the pixel of its origin patch,
    /// and lies inside that patch's extent.
    fn assert_coherent(canvas: &Canvas) {
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if let Some(id) = canvas.origin_of(x, y) {
                    let patch = canvas.patch(id);
                    assert!(patch.contains(x as i32, y as i32));
                    assert_eq!(canvas.pixel(x, y), patch.pixel(x as i32, y as i32));
                }
            }
        }
    }

    #[test]
    fn disjoint_patches_fill_exactly_their_union() {
        let texture = gradient(3, 3);
        let mut canvas = Canvas::new(8, 8);
        canvas.apply(Patch::new(texture.clone(), 0, 0));
        canvas.apply(Patch::new(texture.clone(), 5, 5));

        assert_eq!(canvas.assigned_count(), 18);
        for y in 0..8u32 {
            for x in 0..8u32 {
                let in_first = x < 3 && y < 3;
                let in_second = x >= 5 && y >= 5;
                assert_eq!(canvas.origin_of(x, y).is_some(), in_first || in_second);
            }
        }
        assert_coherent(&canvas);
    }

    #[test]
    fn clipping_keeps_out_of_bounds_patches_quiet() {
        let texture = gradient(4, 4);
        let mut canvas = Canvas::new(6, 6);
        canvas.apply(Patch::new(texture.clone(), -2, -2));
        canvas.apply(Patch::new(texture.clone(), 4, 4));
        canvas.apply(Patch::new(texture.clone(), 100, 100));

        assert_coherent(&canvas);
        assert_eq!(
            canvas.assigned_count(),
            2 * 2 // clipped corner of the first patch
                + 2 * 2 // clipped corner of the second
        );
    }

    #[test]
    fn identical_overlap_cuts_at_zero_cost() {
        // Both patches read the same solid color, so every seam arc has
        // zero capacity and the cut is free: anchored pixels stay with the
        // old patch, interior pixels (unreachable over zero arcs) flip.
        let wide = solid(8, 4, Pixel::new(100, 150, 200));
        let small = solid(4, 4, Pixel::new(100, 150, 200));
        let mut canvas = Canvas::new(8, 8);
        canvas.apply(Patch::new(wide, 0, 0));
        let first = canvas.origin_of(0, 0).unwrap();
        canvas.apply(Patch::new(small, 2, 0));

        assert_coherent(&canvas);
        for y in 0..4u32 {
            // anchored columns of the overlap keep their origin
            assert_eq!(canvas.origin_of(2, y), Some(first));
            assert_eq!(canvas.origin_of(5, y), Some(first));
            // either origin is fine for the rest, but the color never moves
            assert_eq!(canvas.pixel(3, y), Pixel::new(100, 150, 200));
            assert_eq!(canvas.pixel(4, y), Pixel::new(100, 150, 200));
        }
    }

    #[test]
    fn fully_covered_patch_with_no_new_ground_is_rejected() {
        // The new patch claims no fresh pixels, so t has no arcs at all and
        // positive seam costs keep every anchored pixel on the old side.
        let red = solid(8, 4, Pixel::new(255, 0, 0));
        let blue = solid(4, 4, Pixel::new(0, 0, 255));
        let mut canvas = Canvas::new(8, 4);
        canvas.apply(Patch::new(red, 0, 0));
        let first = canvas.origin_of(0, 0).unwrap();
        canvas.apply(Patch::new(blue, 4, 0));

        assert_coherent(&canvas);
        for y in 0..4u32 {
            for x in 0..8u32 {
                assert_eq!(canvas.origin_of(x, y), Some(first));
                assert_eq!(canvas.pixel(x, y), Pixel::new(255, 0, 0));
            }
        }
    }

    #[test]
    fn cut_splits_between_competing_anchors() {
        // Red covers the left, blue lands half on fresh ground. The overlap
        // columns are anchored to opposite sides; the cut crosses between
        // them and every overlap pixel lands with one of the two anchors.
        let red = solid(4, 4, Pixel::new(255, 0, 0));
        let blue = solid(4, 4, Pixel::new(0, 0, 255));
        let mut canvas = Canvas::new(8, 4);
        canvas.apply(Patch::new(red, 0, 0));
        let first = canvas.origin_of(0, 0).unwrap();
        canvas.apply(Patch::new(blue, 2, 0));
        let second = canvas.origin_of(5, 0).unwrap();
        assert_ne!(first, second);

        assert_coherent(&canvas);
        for y in 0..4u32 {
            // the anchors themselves
            assert_eq!(canvas.origin_of(2, y), Some(first));
            assert_eq!(canvas.origin_of(3, y), Some(second));
            // fresh ground always belongs to the new patch
            assert_eq!(canvas.origin_of(4, y), Some(second));
            assert_eq!(canvas.origin_of(5, y), Some(second));
        }
    }

    #[test]
    fn relocatable_seams_survive_a_third_patch() {
        // Build a red|blue seam, then drop a third patch across it; the
        // old seam is carried by seam nodes and the apply must stay
        // coherent whatever the cut decides.
        let red = solid(4, 4, Pixel::new(255, 0, 0));
        let blue = solid(4, 4, Pixel::new(0, 0, 255));
        let green = solid(4, 4, Pixel::new(0, 255, 0));
        let mut canvas = Canvas::new(8, 4);
        canvas.apply(Patch::new(red, 0, 0));
        canvas.apply(Patch::new(blue, 2, 0));
        let before = canvas.assigned_count();
        canvas.apply(Patch::new(green, 1, 0));

        assert_coherent(&canvas);
        assert!(canvas.assigned_count() >= before);
    }

    #[test]
    fn assignment_is_monotone_and_fresh_pixels_adopt_the_new_patch() {
        let texture = gradient(5, 5);
        let mut canvas = Canvas::new(16, 16);
        let mut rng = Sampler::seeded(9);

        let mut check_apply = |canvas: &mut Canvas, x: i32, y: i32| {
            let before: Vec<bool> = canvas.origin.iter().map(|o| o.is_some()).collect();
            canvas.apply(Patch::new(texture.clone(), x, y));
            let id = PatchId((canvas.patches.len() - 1) as u32);

            for (i, was_assigned) in before.iter().enumerate() {
                // monotone: assigned never becomes unassigned
                if *was_assigned {
                    assert!(canvas.origin[i].is_some());
                } else if canvas.origin[i].is_some() {
                    // fresh pixels always come from the newest patch
                    assert_eq!(canvas.origin[i], Some(id));
                }
            }
            assert_coherent(canvas);
        };

        for _ in 0..40 {
            let x = rng.int_in(-4, 15);
            let y = rng.int_in(-4, 15);
            check_apply(&mut canvas, x, y);
        }
        // a deterministic closing pass that covers the whole canvas
        for y in (0..16).step_by(4) {
            for x in (0..16).step_by(4) {
                check_apply(&mut canvas, x, y);
            }
        }
        assert!(canvas.is_complete());
    }

    #[test]
    fn ssd_measures_overlap_difference() {
        let red = solid(4, 4, Pixel::new(255, 0, 0));
        let mut canvas = Canvas::new(8, 8);
        canvas.apply(Patch::new(red.clone(), 0, 0));

        // identical content: zero distance
        assert_eq!(canvas.ssd(&Patch::new(red.clone(), 0, 0)).unwrap(), 0);
        assert_eq!(canvas.ssd(&Patch::new(red.clone(), 2, 2)).unwrap(), 0);

        // no overlap with assigned pixels at all
        assert!(matches!(
            canvas.ssd(&Patch::new(red.clone(), 4, 4)),
            Err(Error::EmptyOverlap)
        ));

        let blue = solid(4, 4, Pixel::new(0, 0, 255));
        let expected = 255u64 * 255 * 2;
        assert_eq!(
            canvas.ssd(&Patch::new(blue.clone(), 0, 0)).unwrap(),
            expected
        );

        // window restriction: only the top-left quadrant is consulted
        assert_eq!(
            canvas.ssd_window(&Patch::new(blue, 0, 0), 0, 0, 2, 2).unwrap(),
            expected
        );
    }
}
