//! Serde model of the Lottie interchange format.
//!
//! Only the parts the evaluation engine binds are modelled. Field names follow
//! the format's short keys. Exporters disagree on small details (scalars
//! wrapped in one-element arrays, 2D vectors where 3D is expected), so values
//! are read leniently.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

/// Document root.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    /// Exporter version string.
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    /// In point, in frames.
    pub ip: f32,
    /// Out point, in frames.
    pub op: f32,
    /// Frame rate.
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub ddd: Option<u8>,
    pub layers: Vec<Layer>,
}

/// A composition layer. `ty` 4 is a shape layer, 3 a null layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Layer {
    pub ty: u8,
    pub ind: Option<u32>,
    /// `ind` of the parent layer.
    pub parent: Option<u32>,
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    /// Start time offset in frames.
    pub st: f32,
    /// Time stretch factor.
    pub sr: f32,
    pub ks: Transform,
    /// 1 when the layer rotates along its motion path.
    pub ao: Option<u32>,
    /// 1 for 3D layers.
    pub ddd: Option<u8>,
    pub hd: Option<bool>,
    pub shapes: Option<Vec<Shape>>,
}

impl Default for Layer {
    fn default() -> Self {
        Layer {
            ty: 0,
            ind: None,
            parent: None,
            nm: None,
            ip: 0.0,
            op: 0.0,
            st: 0.0,
            sr: 1.0,
            ks: Transform::default(),
            ao: None,
            ddd: None,
            hd: None,
            shapes: None,
        }
    }
}

/// Shape items, tagged by `ty`. Unmodelled items deserialize as `Unknown`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "gf")]
    GradientFill(GradientFillShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "rp")]
    Repeater(RepeaterShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(other)]
    Unknown,
}

impl Shape {
    /// Interchange type tag, used for diagnostics.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Shape::Group(_) => "gr",
            Shape::Path(_) => "sh",
            Shape::Fill(_) => "fl",
            Shape::Stroke(_) => "st",
            Shape::GradientFill(_) => "gf",
            Shape::Trim(_) => "tm",
            Shape::Repeater(_) => "rp",
            Shape::Transform(_) => "tr",
            Shape::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GroupShape {
    pub nm: Option<String>,
    pub it: Vec<Shape>,
    pub hd: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PathShape {
    pub nm: Option<String>,
    pub ks: Property<BezierPath>,
    pub hd: Option<bool>,
}

/// Solid fill. Color channels are usually in [0,1].
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FillShape {
    pub nm: Option<String>,
    pub c: Property<Vec4>,
    pub o: Property<f32>,
    /// Fill rule.
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StrokeShape {
    pub nm: Option<String>,
    pub c: Property<Vec4>,
    pub w: Property<f32>,
    pub o: Property<f32>,
    /// Line cap.
    pub lc: u8,
    /// Line join.
    pub lj: u8,
    /// Miter limit.
    pub ml: Option<f32>,
}

/// Gradient fill. `t` is 1 for linear, 2 for radial.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GradientFillShape {
    pub nm: Option<String>,
    pub o: Property<f32>,
    pub s: Property<Vec2>,
    pub e: Property<Vec2>,
    pub t: u8,
    pub g: GradientColors,
}

impl Default for GradientFillShape {
    fn default() -> Self {
        GradientFillShape {
            nm: None,
            o: Property::default(),
            s: Property::default(),
            e: Property::default(),
            t: 1,
            g: GradientColors::default(),
        }
    }
}

/// `p` color stops flattened as `[pos, r, g, b] * p`, optionally followed by
/// `[pos, alpha]` opacity stops.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GradientColors {
    pub p: u32,
    pub k: Property<Vec<f32>>,
}

/// Trim path. `s`/`e` in percent, `o` in degrees; `m` 2 trims grouped paths
/// as one.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TrimShape {
    pub nm: Option<String>,
    pub s: Property<f32>,
    pub e: Property<f32>,
    pub o: Property<f32>,
    pub m: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RepeaterShape {
    pub nm: Option<String>,
    /// Copy count.
    pub c: Property<f32>,
    /// Offset added to every copy index.
    pub o: Property<f32>,
    /// Composite order.
    pub m: u8,
    pub tr: RepeaterTransform,
}

/// A transform plus the opacity of the first (`so`) and last (`eo`) copy.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: Transform,
    #[serde(default)]
    pub so: Property<f32>,
    #[serde(default)]
    pub eo: Property<f32>,
}

/// Group transform, listed among the group's items.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

/// Layer or group transform. Angles are in degrees, scale and opacity in
/// percent. Absent properties stay [`Value::Default`].
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Transform {
    /// Anchor point.
    pub a: Property<Vec3DefaultZero>,
    pub p: PositionProperty,
    pub s: Property<Vec3Scale>,
    /// Z rotation; older files call it `r`.
    #[serde(alias = "r")]
    pub rz: Property<f32>,
    pub rx: Option<Property<f32>>,
    pub ry: Option<Property<f32>>,
    /// Orientation, 3D layers only.
    pub or: Option<Property<Vec3DefaultZero>>,
    /// Skew amount.
    pub sk: Property<f32>,
    /// Skew axis.
    pub sa: Property<f32>,
    pub o: Property<f32>,
}

/// Position is either one point property or one property per axis.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        #[serde(default, rename = "s")]
        split: Option<bool>,
        x: Property<f32>,
        y: Property<f32>,
        #[serde(default)]
        z: Option<Property<f32>>,
    },
    Unified(Property<Vec3DefaultZero>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

/// An animatable property: `a` is the animated flag, `k` the value.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default, bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
        }
    }
}

impl<T> Property<T> {
    /// A property holding one fixed value.
    pub fn fixed(value: T) -> Self {
        Property {
            k: Value::Static(value),
            ..Property::default()
        }
    }

    /// A property animated by the given keyframes.
    pub fn animated(keyframes: Vec<Keyframe<T>>) -> Self {
        Property {
            a: 1,
            k: Value::Animated(keyframes),
            ix: None,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.k, Value::Animated(_))
    }
}

/// Property payload. `Default` means the document left the value out.
#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Value::Default);
        }
        if is_keyframe_list(&raw) {
            let keyframes = serde_json::from_value(raw).map_err(D::Error::custom)?;
            return Ok(Value::Animated(keyframes));
        }
        Ok(lenient(raw)
            .map_err(D::Error::custom)?
            .map_or(Value::Default, Value::Static))
    }
}

/// Keyframe lists are arrays of objects carrying a time.
fn is_keyframe_list(raw: &serde_json::Value) -> bool {
    raw.as_array()
        .and_then(|items| items.first())
        .and_then(serde_json::Value::as_object)
        .is_some_and(|first| first.contains_key("t"))
}

/// Read `raw` as `T`, or as the first element of a `[T]`. An empty array
/// reads as no value. Anything else is an error from the `T` attempt.
fn lenient<T: DeserializeOwned>(raw: serde_json::Value) -> serde_json::Result<Option<T>> {
    let direct = match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => return Ok(Some(value)),
        Err(err) => err,
    };
    match serde_json::from_value::<Vec<T>>(raw) {
        Ok(items) => Ok(items.into_iter().next()),
        Err(_) => Err(direct),
    }
}

fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(None);
    }
    lenient(raw).map_err(D::Error::custom)
}

/// One document keyframe. It ends where the next keyframe starts; `e` is
/// only written by older exporters.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    /// Start frame.
    pub t: f32,
    #[serde(default, deserialize_with = "lenient_option")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub e: Option<T>,
    /// Easing in-tangent.
    #[serde(default)]
    pub i: Option<BezierTangent>,
    /// Easing out-tangent.
    #[serde(default)]
    pub o: Option<BezierTangent>,
    /// Spatial out-tangent, relative to the start value.
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    /// Spatial in-tangent, relative to the end value.
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    /// 1 for hold keyframes.
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    /// Keyframe starting at `t` with value `s`, easing linearly.
    pub fn linear(t: f32, s: T) -> Self {
        Keyframe {
            s: Some(s),
            ..Keyframe::terminal(t)
        }
    }

    /// Keyframe that only marks the end of the previous segment.
    pub fn terminal(t: f32) -> Self {
        Keyframe {
            t,
            s: None,
            e: None,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.h == Some(1)
    }
}

/// Easing control point, e.g. `{"x": [0.48], "y": [1]}`. Multi-dimensional
/// properties may carry one component per axis.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BezierTangent {
    #[serde(deserialize_with = "one_or_many")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "one_or_many")]
    pub y: Vec<f32>,
}

impl BezierTangent {
    pub fn new(x: f32, y: f32) -> Self {
        BezierTangent {
            x: vec![x],
            y: vec![y],
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Components {
        One(f32),
        Many(Vec<f32>),
    }

    Ok(match Components::deserialize(deserializer)? {
        Components::One(value) => vec![value],
        Components::Many(values) => values,
    })
}

/// Pad a 1-3 component array to three components.
fn padded(components: &[f32], fill: Vec3) -> Vec3 {
    let mut out = fill;
    for (slot, value) in out.iter_mut().zip(components) {
        *slot = *value;
    }
    out
}

/// A point that may be written in 2D; z defaults to 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Vec3DefaultZero(pub Vec3);

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let components = Vec::<f32>::deserialize(deserializer)?;
        Ok(Vec3DefaultZero(padded(&components, [0.0; 3])))
    }
}

/// Percent scale that may be written in 2D; z defaults to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0; 3])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let components = Vec::<f32>::deserialize(deserializer)?;
        Ok(Vec3Scale(padded(&components, [0.0, 0.0, 100.0])))
    }
}

/// Path vertices with in/out tangents relative to their vertex.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BezierPath {
    /// Closed.
    pub c: bool,
    pub i: Vec<Vec2>,
    pub o: Vec<Vec2>,
    pub v: Vec<Vec2>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_animated_scalar_keyframes() {
        let prop: Property<f32> = serde_json::from_value(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0], "o": { "x": [0.33], "y": [0] }, "i": { "x": [0.67], "y": [1] } },
                { "t": 30, "s": [100] }
            ]
        }))
        .unwrap();

        match prop.k {
            Value::Animated(kfs) => {
                assert_eq!(kfs.len(), 2);
                assert_eq!(kfs[0].s, Some(0.0));
                assert_eq!(kfs[1].s, Some(100.0));
                assert_eq!(kfs[0].o.as_ref().unwrap().x, vec![0.33]);
            }
            other => panic!("expected animated value, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_tangents_are_accepted() {
        let tangent: BezierTangent = serde_json::from_value(json!({ "x": 0.5, "y": 1 })).unwrap();
        assert_eq!(tangent.x, vec![0.5]);
        assert_eq!(tangent.y, vec![1.0]);
    }

    #[test]
    fn test_static_vec3_defaults_z() {
        let prop: Property<Vec3DefaultZero> =
            serde_json::from_value(json!({ "a": 0, "k": [10, 20] })).unwrap();
        match prop.k {
            Value::Static(v) => assert_eq!(v.0, [10.0, 20.0, 0.0]),
            other => panic!("expected static value, got {other:?}"),
        }
        let scale: Vec3Scale = serde_json::from_value(json!([50, 25])).unwrap();
        assert_eq!(scale.0, [50.0, 25.0, 100.0]);
    }

    #[test]
    fn test_wrapped_scalar_is_static() {
        let prop: Property<f32> = serde_json::from_value(json!({ "k": [42] })).unwrap();
        assert!(matches!(prop.k, Value::Static(v) if v == 42.0));
    }

    #[test]
    fn test_malformed_keyframes_are_an_error() {
        let parsed = serde_json::from_value::<Property<f32>>(json!({
            "a": 1,
            "k": [ { "t": "soon", "s": [0] } ]
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_mistyped_values_are_an_error() {
        let stat = serde_json::from_value::<Property<f32>>(json!({ "k": "fifty" }));
        assert!(stat.is_err());
        let keyed = serde_json::from_value::<Property<f32>>(json!({
            "a": 1,
            "k": [ { "t": 0, "s": ["fifty"] }, { "t": 10, "s": [100] } ]
        }));
        assert!(keyed.is_err());
    }

    #[test]
    fn test_empty_static_array_is_default() {
        let prop: Property<f32> = serde_json::from_value(json!({ "k": [] })).unwrap();
        assert!(matches!(prop.k, Value::Default));
    }

    #[test]
    fn test_split_position() {
        let p: PositionProperty = serde_json::from_value(json!({
            "s": true,
            "x": { "a": 0, "k": 5 },
            "y": { "a": 0, "k": 7 }
        }))
        .unwrap();
        assert!(matches!(p, PositionProperty::Split { .. }));
    }

    #[test]
    fn test_layer_defaults() {
        let layer: Layer = serde_json::from_value(json!({ "ty": 3 })).unwrap();
        assert_eq!(layer.sr, 1.0);
        assert!(matches!(layer.ks.o.k, Value::Default));
    }

    #[test]
    fn test_unknown_shape_tag() {
        let shapes: Vec<Shape> = serde_json::from_value(json!([
            { "ty": "zz", "nm": "ZigZag" },
            { "ty": "tm", "s": { "a": 0, "k": 0 }, "e": { "a": 0, "k": 50 }, "o": { "a": 0, "k": 0 } }
        ]))
        .unwrap();
        assert!(matches!(shapes[0], Shape::Unknown));
        assert_eq!(shapes[1].type_tag(), "tm");
    }
}
