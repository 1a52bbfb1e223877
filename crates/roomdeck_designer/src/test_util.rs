//! Model fixtures shared by unit and integration tests.

use base64::Engine;

const BOX_INDICES: [u16; 36] = [
    0, 1, 2, 0, 2, 3, // -z
    4, 6, 5, 4, 7, 6, // +z
    0, 4, 5, 0, 5, 1, // -y
    3, 2, 6, 3, 6, 7, // +y
    0, 3, 7, 0, 7, 4, // -x
    1, 5, 6, 1, 6, 2, // +x
];

/// Embedded glTF holding one box of the given size. The box is centered
/// on X/Z and sits `lift` above its own origin, so the decoded template's
/// minimum Y equals `lift`.
pub fn box_glb_lifted(width: f32, height: f32, depth: f32, lift: f32) -> Vec<u8> {
    let (hx, hz) = (width * 0.5, depth * 0.5);
    let (y0, y1) = (lift, lift + height);
    let corners = [
        [-hx, y0, -hz],
        [hx, y0, -hz],
        [hx, y1, -hz],
        [-hx, y1, -hz],
        [-hx, y0, hz],
        [hx, y0, hz],
        [hx, y1, hz],
        [-hx, y1, hz],
    ];

    let mut buf = Vec::new();
    for c in corners {
        for v in c {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    for i in BOX_INDICES {
        buf.extend_from_slice(&i.to_le_bytes());
    }
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);

    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "body", "mesh": 0 }}],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
       "min": [{minx}, {y0}, {minz}], "max": [{hx}, {y1}, {hz}] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 36, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 96, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 96, "byteLength": 72, "target": 34963 }}
  ],
  "buffers": [{{ "byteLength": {len}, "uri": "data:application/octet-stream;base64,{b64}" }}]
}}"#,
        minx = -hx,
        minz = -hz,
        len = buf.len(),
    )
    .into_bytes()
}

/// A box of the given size resting on its own origin.
pub fn box_glb(width: f32, height: f32, depth: f32) -> Vec<u8> {
    box_glb_lifted(width, height, depth, 0.0)
}
