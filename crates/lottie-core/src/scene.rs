//! Composition-level evaluation.
//!
//! [`LottieAsset`] binds a document once into shared keyframe tracks.
//! [`LottiePlayer`] instantiates evaluators over those tracks and pushes one
//! global progress through every layer, producing a [`ResolvedFrame`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use glam::{Mat3, Vec2};
use kurbo::BezPath;
use lottie_data::model::{self as data, LottieJson};
use tracing::{debug, warn};

use crate::animation::{
    ColorAnimation, FloatAnimation, GradientAnimation, IntegerAnimation, PointAnimation,
    ShapeAnimation,
};
use crate::color::{Color, GradientColor};
use crate::config::EngineConfig;
use crate::convert::TrackBuilder;
use crate::error::{LottieError, Result};
use crate::timeline::{LayerSpan, LayerTime, Timeline};
use crate::transform::TransformAnimation;
use crate::trim::{trim_paths, TrimMode, TrimWindow};

const SHAPE_LAYER: u8 = 4;
const NULL_LAYER: u8 = 3;

fn warn_unsupported_shape_once(tag: &str, name: Option<&str>) {
    static UNSUPPORTED_SHAPES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let store = UNSUPPORTED_SHAPES.get_or_init(|| Mutex::new(HashSet::new()));
    if let Ok(mut seen) = store.lock() {
        if seen.insert(tag.to_string()) {
            warn!(
                shape = tag,
                name = name.unwrap_or("unnamed"),
                "unsupported shape item skipped"
            );
        }
    }
}

fn warn_unsupported_layer_once(ty: u8, name: Option<&str>) {
    static UNSUPPORTED_LAYERS: OnceLock<Mutex<HashSet<u8>>> = OnceLock::new();
    let store = UNSUPPORTED_LAYERS.get_or_init(|| Mutex::new(HashSet::new()));
    if let Ok(mut seen) = store.lock() {
        if seen.insert(ty) {
            warn!(
                layer_type = ty,
                name = name.unwrap_or("unnamed"),
                "layer content is not evaluated, only its transform"
            );
        }
    }
}

/// Animated trim values; start and end in percent, offset in degrees.
#[derive(Debug, Clone)]
pub struct TrimNode {
    pub start: FloatAnimation,
    pub end: FloatAnimation,
    pub offset: FloatAnimation,
    pub mode: TrimMode,
}

impl TrimNode {
    pub fn window(&self) -> TrimWindow {
        TrimWindow::new(
            *self.start.value() / 100.0,
            *self.end.value() / 100.0,
            *self.offset.value() / 360.0,
        )
    }
}

#[derive(Debug, Clone)]
pub struct RepeaterNode {
    pub copies: IntegerAnimation,
    pub offset: FloatAnimation,
    pub transform: TransformAnimation,
}

/// One bound shape item.
#[derive(Debug, Clone)]
pub enum ShapeNode {
    Group {
        name: Option<String>,
        transform: TransformAnimation,
        items: Vec<ShapeNode>,
    },
    Path {
        name: Option<String>,
        shape: ShapeAnimation,
    },
    Fill {
        name: Option<String>,
        color: ColorAnimation,
        opacity: FloatAnimation,
    },
    Stroke {
        name: Option<String>,
        color: ColorAnimation,
        width: FloatAnimation,
        opacity: FloatAnimation,
    },
    GradientFill {
        name: Option<String>,
        linear: bool,
        start: PointAnimation,
        end: PointAnimation,
        colors: GradientAnimation,
        opacity: FloatAnimation,
    },
    Trim(TrimNode),
    Repeater(RepeaterNode),
}

impl ShapeNode {
    pub fn name(&self) -> Option<&str> {
        match self {
            ShapeNode::Group { name, .. }
            | ShapeNode::Path { name, .. }
            | ShapeNode::Fill { name, .. }
            | ShapeNode::Stroke { name, .. }
            | ShapeNode::GradientFill { name, .. } => name.as_deref(),
            ShapeNode::Trim(_) | ShapeNode::Repeater(_) => None,
        }
    }

    /// Advance every property and report whether any resolved value changed.
    pub fn set_progress(&mut self, progress: f32) -> bool {
        match self {
            ShapeNode::Group {
                transform, items, ..
            } => {
                transform.set_progress(progress);
                let mut changed = transform.did_change();
                for item in items {
                    changed |= item.set_progress(progress);
                }
                changed
            }
            ShapeNode::Path { shape, .. } => {
                shape.set_progress(progress);
                shape.did_change()
            }
            ShapeNode::Fill { color, opacity, .. } => {
                color.set_progress(progress);
                opacity.set_progress(progress);
                color.did_change() | opacity.did_change()
            }
            ShapeNode::Stroke {
                color,
                width,
                opacity,
                ..
            } => {
                color.set_progress(progress);
                width.set_progress(progress);
                opacity.set_progress(progress);
                color.did_change() | width.did_change() | opacity.did_change()
            }
            ShapeNode::GradientFill {
                start,
                end,
                colors,
                opacity,
                ..
            } => {
                start.set_progress(progress);
                end.set_progress(progress);
                colors.set_progress(progress);
                opacity.set_progress(progress);
                start.did_change() | end.did_change() | colors.did_change() | opacity.did_change()
            }
            ShapeNode::Trim(trim) => {
                trim.start.set_progress(progress);
                trim.end.set_progress(progress);
                trim.offset.set_progress(progress);
                trim.start.did_change() | trim.end.did_change() | trim.offset.did_change()
            }
            ShapeNode::Repeater(rp) => {
                rp.copies.set_progress(progress);
                rp.offset.set_progress(progress);
                rp.transform.set_progress(progress);
                rp.copies.did_change() | rp.offset.did_change() | rp.transform.did_change()
            }
        }
    }
}

/// One layer bound to its evaluators.
#[derive(Debug, Clone)]
pub struct LayerNode {
    pub name: Option<String>,
    pub index: Option<u32>,
    /// Position of the parent layer in the asset's layer list.
    pub parent: Option<usize>,
    pub span: LayerSpan,
    pub time: LayerTime,
    pub hidden: bool,
    pub transform: TransformAnimation,
    pub contents: Vec<ShapeNode>,
}

impl LayerNode {
    /// Transform keyframes run on composition time; contents run on the
    /// layer's stretched time.
    pub fn set_progress(&mut self, timeline: &Timeline, progress: f32) -> bool {
        self.transform.set_progress(progress);
        let mut changed = self.transform.did_change();
        let local = self.time.local_progress(timeline, progress);
        for item in &mut self.contents {
            changed |= item.set_progress(local);
        }
        changed
    }

    /// Find a shape item by name, searching groups depth-first.
    pub fn shape_mut(&mut self, name: &str) -> Option<&mut ShapeNode> {
        fn find<'a>(items: &'a mut [ShapeNode], name: &str) -> Option<&'a mut ShapeNode> {
            for item in items {
                if item.name() == Some(name) {
                    return Some(item);
                }
                if let ShapeNode::Group { items, .. } = item {
                    if let Some(found) = find(items, name) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find(&mut self.contents, name)
    }
}

/// Immutable bound document. Tracks are shared by every player created from
/// it.
#[derive(Debug, Clone)]
pub struct LottieAsset {
    pub timeline: Timeline,
    pub width: f32,
    pub height: f32,
    pub config: EngineConfig,
    pub layers: Vec<LayerNode>,
}

impl LottieAsset {
    pub fn from_model(model: &LottieJson) -> Result<Self> {
        Self::with_config(model, EngineConfig::default())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: LottieJson = serde_json::from_str(json)?;
        Self::from_model(&model)
    }

    pub fn with_config(model: &LottieJson, config: EngineConfig) -> Result<Self> {
        let timeline = Timeline::new(model.ip, model.op, model.fr)?;
        let builder = TrackBuilder::new(&timeline, &config);

        let mut layers = Vec::with_capacity(model.layers.len());
        for layer in &model.layers {
            layers.push(bind_layer(&builder, layer)?);
        }
        resolve_parents(&model.layers, &mut layers)?;

        debug!(
            name = model.nm.as_deref().unwrap_or("unnamed"),
            layers = layers.len(),
            shapes = layers.iter().map(|l| count_shapes(&l.contents)).sum::<usize>(),
            frames = timeline.duration_frames(),
            "bound lottie asset"
        );

        Ok(Self {
            timeline,
            width: model.w as f32,
            height: model.h as f32,
            config,
            layers,
        })
    }

    pub fn layer(&self, name: &str) -> Option<&LayerNode> {
        self.layers.iter().find(|l| l.name.as_deref() == Some(name))
    }
}

fn count_shapes(items: &[ShapeNode]) -> usize {
    items
        .iter()
        .map(|item| match item {
            ShapeNode::Group { items, .. } => 1 + count_shapes(items),
            _ => 1,
        })
        .sum()
}

fn bind_layer(builder: &TrackBuilder<'_>, layer: &data::Layer) -> Result<LayerNode> {
    let is_3d = layer.ddd == Some(1);
    let auto_orient = layer.ao == Some(1);
    let transform = builder.transform(&layer.ks, is_3d, auto_orient)?;

    let contents = match (layer.ty, &layer.shapes) {
        (SHAPE_LAYER, Some(shapes)) => bind_shapes(builder, shapes)?,
        (SHAPE_LAYER | NULL_LAYER, _) => Vec::new(),
        (ty, _) => {
            warn_unsupported_layer_once(ty, layer.nm.as_deref());
            Vec::new()
        }
    };

    Ok(LayerNode {
        name: layer.nm.clone(),
        index: layer.ind,
        parent: None,
        span: LayerSpan::new(layer.ip, layer.op),
        // `st` only offsets precomposition sources; layer keyframes are in
        // composition time.
        time: LayerTime::new(0.0, layer.sr),
        hidden: layer.hd.unwrap_or(false),
        transform,
        contents,
    })
}

fn bind_shapes(builder: &TrackBuilder<'_>, shapes: &[data::Shape]) -> Result<Vec<ShapeNode>> {
    let mut nodes = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let node = match shape {
            data::Shape::Group(g) => {
                if g.hd == Some(true) {
                    continue;
                }
                let mut transform = TransformAnimation::new();
                for item in &g.it {
                    if let data::Shape::Transform(tr) = item {
                        transform = builder.transform(&tr.t, false, false)?;
                    }
                }
                let items = bind_shapes(builder, &g.it)?;
                ShapeNode::Group {
                    name: g.nm.clone(),
                    transform,
                    items,
                }
            }
            data::Shape::Path(p) => {
                if p.hd == Some(true) {
                    continue;
                }
                ShapeNode::Path {
                    name: p.nm.clone(),
                    shape: builder.shape(&p.ks)?,
                }
            }
            data::Shape::Fill(f) => ShapeNode::Fill {
                name: f.nm.clone(),
                color: builder.color(&f.c)?,
                opacity: builder.scalar(&f.o, 100.0)?,
            },
            data::Shape::Stroke(s) => ShapeNode::Stroke {
                name: s.nm.clone(),
                color: builder.color(&s.c)?,
                width: builder.scalar(&s.w, 1.0)?,
                opacity: builder.scalar(&s.o, 100.0)?,
            },
            data::Shape::GradientFill(gf) => ShapeNode::GradientFill {
                name: gf.nm.clone(),
                linear: gf.t != 2,
                start: builder.point(&gf.s)?,
                end: builder.point(&gf.e)?,
                colors: builder.gradient(&gf.g)?,
                opacity: builder.scalar(&gf.o, 100.0)?,
            },
            data::Shape::Trim(t) => ShapeNode::Trim(TrimNode {
                start: builder.scalar(&t.s, 0.0)?,
                end: builder.scalar(&t.e, 100.0)?,
                offset: builder.scalar(&t.o, 0.0)?,
                mode: TrimMode::from_code(t.m),
            }),
            data::Shape::Repeater(rp) => ShapeNode::Repeater(RepeaterNode {
                copies: builder.animation(&rp.c, 1, |v: &f32| Ok(v.round() as i32))?,
                offset: builder.scalar(&rp.o, 0.0)?,
                transform: builder.repeater_transform(&rp.tr)?,
            }),
            // Consumed by the enclosing group.
            data::Shape::Transform(_) => continue,
            data::Shape::Unknown => {
                warn_unsupported_shape_once(shape.type_tag(), None);
                continue;
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn resolve_parents(source: &[data::Layer], layers: &mut [LayerNode]) -> Result<()> {
    let by_index: HashMap<u32, usize> = source
        .iter()
        .enumerate()
        .filter_map(|(pos, layer)| layer.ind.map(|ind| (ind, pos)))
        .collect();

    for (pos, layer) in source.iter().enumerate() {
        let Some(parent) = layer.parent else {
            continue;
        };
        match by_index.get(&parent) {
            Some(&parent_pos) => layers[pos].parent = Some(parent_pos),
            None => warn!(
                layer = layer.nm.as_deref().unwrap_or("unnamed"),
                parent, "parent layer not found, treating as root"
            ),
        }
    }

    for start in 0..layers.len() {
        let mut steps = 0;
        let mut cursor = layers[start].parent;
        while let Some(pos) = cursor {
            steps += 1;
            if steps > layers.len() {
                return Err(LottieError::model(format!(
                    "layer {} has a cyclic parent chain",
                    layers[start].name.as_deref().unwrap_or("unnamed")
                )));
            }
            cursor = layers[pos].parent;
        }
    }
    Ok(())
}

/// How a resolved path is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Fill {
        color: Color,
    },
    Stroke {
        color: Color,
        width: f32,
    },
    Gradient {
        linear: bool,
        start: Vec2,
        end: Vec2,
        colors: GradientColor,
    },
}

/// A painted path, in layer coordinates once `matrix` is applied.
#[derive(Debug, Clone)]
pub struct ResolvedShape {
    pub path: BezPath,
    pub matrix: Mat3,
    pub opacity: f32,
    pub paint: Paint,
}

#[derive(Debug, Clone)]
pub struct ResolvedLayer {
    pub name: Option<String>,
    pub index: Option<u32>,
    /// Layer to composition, parents included.
    pub matrix: Mat3,
    pub opacity: f32,
    pub visible: bool,
    pub shapes: Vec<ResolvedShape>,
}

#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub progress: f32,
    pub frame: f32,
    pub layers: Vec<ResolvedLayer>,
}

impl ResolvedFrame {
    pub fn layer(&self, name: &str) -> Option<&ResolvedLayer> {
        self.layers.iter().find(|l| l.name.as_deref() == Some(name))
    }
}

/// A path collected while walking shape items, with the transform that
/// places it in layer space.
#[derive(Debug, Clone)]
struct Geometry {
    path: BezPath,
    matrix: Mat3,
    opacity: f32,
}

struct ShapeResolver<'a> {
    config: &'a EngineConfig,
}

impl ShapeResolver<'_> {
    /// Resolve one item list. Returns the painted shapes and the geometry the
    /// list contributes to paints in the enclosing list.
    fn resolve(
        &self,
        items: &[ShapeNode],
        inherited_trim: Option<(TrimWindow, TrimMode)>,
    ) -> (Vec<ResolvedShape>, Vec<Geometry>) {
        let mut shapes = Vec::new();
        let mut geometries: Vec<Geometry> = Vec::new();

        // Trims apply to every path in their list and in nested groups.
        let mut trim = inherited_trim;
        for item in items {
            if let ShapeNode::Trim(t) = item {
                trim = Some((t.window(), t.mode));
            }
        }

        for item in items {
            match item {
                ShapeNode::Path { shape, .. } => geometries.push(Geometry {
                    path: shape.value().to_bez_path(),
                    matrix: Mat3::IDENTITY,
                    opacity: 1.0,
                }),
                ShapeNode::Group {
                    transform, items, ..
                } => {
                    let matrix = transform.matrix();
                    let opacity = transform.opacity();
                    let (group_shapes, group_geometries) = self.resolve(items, trim);
                    shapes.extend(group_shapes.into_iter().map(|mut s| {
                        s.matrix = matrix * s.matrix;
                        s.opacity *= opacity;
                        s
                    }));
                    geometries.extend(group_geometries.into_iter().map(|mut g| {
                        g.matrix = matrix * g.matrix;
                        g.opacity *= opacity;
                        g
                    }));
                }
                ShapeNode::Fill { color, opacity, .. } => {
                    let paint = Paint::Fill {
                        color: *color.value(),
                    };
                    self.paint(&geometries, trim, paint, *opacity.value() / 100.0, &mut shapes);
                }
                ShapeNode::Stroke {
                    color,
                    width,
                    opacity,
                    ..
                } => {
                    let paint = Paint::Stroke {
                        color: *color.value(),
                        width: *width.value(),
                    };
                    self.paint(&geometries, trim, paint, *opacity.value() / 100.0, &mut shapes);
                }
                ShapeNode::GradientFill {
                    linear,
                    start,
                    end,
                    colors,
                    opacity,
                    ..
                } => {
                    let paint = Paint::Gradient {
                        linear: *linear,
                        start: *start.value(),
                        end: *end.value(),
                        colors: colors.value().clone(),
                    };
                    self.paint(&geometries, trim, paint, *opacity.value() / 100.0, &mut shapes);
                }
                ShapeNode::Repeater(rp) => {
                    Self::repeat(rp, &mut geometries, &mut shapes);
                }
                ShapeNode::Trim(_) => {}
            }
        }
        (shapes, geometries)
    }

    fn paint(
        &self,
        geometries: &[Geometry],
        trim: Option<(TrimWindow, TrimMode)>,
        paint: Paint,
        opacity: f32,
        out: &mut Vec<ResolvedShape>,
    ) {
        let paths: Vec<BezPath> = geometries.iter().map(|g| g.path.clone()).collect();
        let paths = match trim {
            Some((window, mode)) => trim_paths(&paths, &window, mode, self.config),
            None => paths,
        };
        for (geometry, path) in geometries.iter().zip(paths) {
            if path.elements().is_empty() {
                continue;
            }
            out.push(ResolvedShape {
                path,
                matrix: geometry.matrix,
                opacity: geometry.opacity * opacity,
                paint: paint.clone(),
            });
        }
    }

    /// Replace everything collected so far with `copies` transformed copies.
    fn repeat(rp: &RepeaterNode, geometries: &mut Vec<Geometry>, shapes: &mut Vec<ResolvedShape>) {
        let copies = (*rp.copies.value()).max(0) as usize;
        let offset = *rp.offset.value();
        let original_geometries = std::mem::take(geometries);
        let original_shapes = std::mem::take(shapes);

        for index in 0..copies {
            let matrix = rp.transform.matrix_for_repeater(index as f32 + offset);
            let opacity = rp.transform.opacity_for_copy(index, copies);
            geometries.extend(original_geometries.iter().map(|g| Geometry {
                path: g.path.clone(),
                matrix: matrix * g.matrix,
                opacity: g.opacity * opacity,
            }));
            shapes.extend(original_shapes.iter().map(|s| ResolvedShape {
                path: s.path.clone(),
                matrix: matrix * s.matrix,
                opacity: s.opacity * opacity,
                paint: s.paint.clone(),
            }));
        }
    }
}

/// Per-instance state over a shared [`LottieAsset`].
#[derive(Debug, Clone)]
pub struct LottiePlayer {
    asset: Arc<LottieAsset>,
    layers: Vec<LayerNode>,
    progress: f32,
    changed: bool,
}

impl LottiePlayer {
    pub fn new(asset: Arc<LottieAsset>) -> Self {
        let layers = asset.layers.clone();
        let mut player = Self {
            asset,
            layers,
            progress: 0.0,
            changed: true,
        };
        player.set_progress(0.0);
        player
    }

    pub fn asset(&self) -> &Arc<LottieAsset> {
        &self.asset
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn frame(&self) -> f32 {
        self.asset.timeline.frame_for_progress(self.progress)
    }

    pub fn layers(&self) -> &[LayerNode] {
        &self.layers
    }

    /// Mutable access by layer name, e.g. to install value callbacks.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut LayerNode> {
        self.layers
            .iter_mut()
            .find(|l| l.name.as_deref() == Some(name))
    }

    /// Drive every layer from one global progress, clamped to [0,1].
    pub fn set_progress(&mut self, progress: f32) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let timeline = self.asset.timeline;
        for layer in &mut self.layers {
            let was_visible = layer.span.is_visible_at(&timeline, self.progress);
            self.changed |= layer.set_progress(&timeline, progress);
            self.changed |= was_visible != layer.span.is_visible_at(&timeline, progress);
        }
        self.progress = progress;
    }

    pub fn set_frame(&mut self, frame: f32) {
        self.set_progress(self.asset.timeline.progress_for_frame(frame));
    }

    /// Whether any resolved value changed since the last call.
    pub fn did_change(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn render_frame(&mut self, progress: f32) -> ResolvedFrame {
        self.set_progress(progress);
        self.resolve()
    }

    /// Snapshot of the current values.
    pub fn resolve(&self) -> ResolvedFrame {
        let resolver = ShapeResolver {
            config: &self.asset.config,
        };
        let timeline = &self.asset.timeline;
        let local: Vec<Mat3> = self.layers.iter().map(|l| l.transform.matrix()).collect();

        let layers = self
            .layers
            .iter()
            .enumerate()
            .map(|(pos, layer)| {
                let (shapes, _) = resolver.resolve(&layer.contents, None);
                ResolvedLayer {
                    name: layer.name.clone(),
                    index: layer.index,
                    matrix: self.world_matrix(pos, &local),
                    opacity: layer.transform.opacity(),
                    visible: !layer.hidden && layer.span.is_visible_at(timeline, self.progress),
                    shapes,
                }
            })
            .collect();

        ResolvedFrame {
            progress: self.progress,
            frame: self.frame(),
            layers,
        }
    }

    fn world_matrix(&self, pos: usize, local: &[Mat3]) -> Mat3 {
        let mut matrix = local[pos];
        let mut cursor = self.layers[pos].parent;
        while let Some(parent) = cursor {
            matrix = local[parent] * matrix;
            cursor = self.layers[parent].parent;
        }
        matrix
    }
}
