//! ICC profiles: the sRGB profile embedded in every output, and the
//! description lookup used to classify a tagged source.

use std::sync::OnceLock;

use crate::color::srgb_to_linear;

/// Description carried by the embedded output profile.
pub const SRGB_DESCRIPTION: &str = "sRGB IEC61966-2.1";

/// Entries in the sampled transfer curve.
const TRC_ENTRIES: usize = 1024;

/// D50 PCS illuminant.
const D50: [f64; 3] = [0.9642, 1.0, 0.8249];

/// sRGB primaries Bradford-adapted to D50.
const SRGB_COLORANTS: [[f64; 3]; 3] = [
    [0.436_074_7, 0.222_504_5, 0.013_932_2],
    [0.385_064_9, 0.716_878_6, 0.097_104_5],
    [0.143_080_4, 0.060_616_9, 0.714_173_3],
];

/// The ICC v2 display profile for sRGB, built once.
pub fn srgb_profile() -> &'static [u8] {
    static PROFILE: OnceLock<Vec<u8>> = OnceLock::new();
    PROFILE.get_or_init(|| build_matrix_profile(SRGB_DESCRIPTION, SRGB_COLORANTS))
}

/// Build a matrix/TRC display profile with the sRGB transfer curve.
///
/// `colorants` holds the red, green and blue XYZ columns relative to D50.
pub(crate) fn build_matrix_profile(description: &str, colorants: [[f64; 3]; 3]) -> Vec<u8> {
    let trc = curve_tag();
    let tags: [(&[u8; 4], Vec<u8>); 7] = [
        (b"desc", description_tag(description)),
        (b"cprt", text_tag("No copyright, use freely")),
        (b"wtpt", xyz_tag(D50)),
        (b"rXYZ", xyz_tag(colorants[0])),
        (b"gXYZ", xyz_tag(colorants[1])),
        (b"bXYZ", xyz_tag(colorants[2])),
        (b"rTRC", trc),
    ];
    // gTRC and bTRC share the rTRC data
    let entry_count = tags.len() + 2;

    let mut table = Vec::with_capacity(4 + entry_count * 12);
    let mut data = Vec::new();
    table.extend_from_slice(&(entry_count as u32).to_be_bytes());

    let data_start = 128 + 4 + entry_count * 12;
    let mut trc_entry = (0u32, 0u32);
    for (signature, body) in &tags {
        let offset = (data_start + data.len()) as u32;
        let size = body.len() as u32;
        push_entry(&mut table, signature, offset, size);
        if *signature == b"rTRC" {
            trc_entry = (offset, size);
        }
        data.extend_from_slice(body);
        while data.len() % 4 != 0 {
            data.push(0);
        }
    }
    push_entry(&mut table, b"gTRC", trc_entry.0, trc_entry.1);
    push_entry(&mut table, b"bTRC", trc_entry.0, trc_entry.1);

    let total = 128 + table.len() + data.len();
    let mut profile = Vec::with_capacity(total);
    profile.extend_from_slice(&(total as u32).to_be_bytes());
    profile.extend_from_slice(&[0; 4]); // preferred CMM
    profile.extend_from_slice(&[0x02, 0x10, 0x00, 0x00]); // version 2.1
    profile.extend_from_slice(b"mntr");
    profile.extend_from_slice(b"RGB ");
    profile.extend_from_slice(b"XYZ ");
    profile.extend_from_slice(&[0; 12]); // creation date
    profile.extend_from_slice(b"acsp");
    profile.extend_from_slice(&[0; 4]); // platform
    profile.extend_from_slice(&[0; 4]); // flags
    profile.extend_from_slice(&[0; 8]); // manufacturer, model
    profile.extend_from_slice(&[0; 8]); // attributes
    profile.extend_from_slice(&[0; 4]); // perceptual intent
    profile.extend_from_slice(&s15_fixed16(D50));
    profile.extend_from_slice(&[0; 4]); // creator
    profile.resize(128, 0);
    profile.extend_from_slice(&table);
    profile.extend_from_slice(&data);
    profile
}

/// Read the human-readable description of an ICC profile.
///
/// Understands the v2 `desc` and the v4 `mluc` encodings. Returns `None`
/// for anything too short or without a description tag.
pub fn profile_description(profile: &[u8]) -> Option<String> {
    let count = read_u32(profile, 128)? as usize;
    let (offset, size) = (0..count).find_map(|i| {
        let entry = 132 + i * 12;
        if profile.get(entry..entry + 4)? == b"desc" {
            Some((read_u32(profile, entry + 4)? as usize, read_u32(profile, entry + 8)? as usize))
        } else {
            None
        }
    })?;
    let tag = profile.get(offset..offset.checked_add(size)?)?;

    match tag.get(0..4)? {
        b"desc" => {
            let len = read_u32(tag, 8)? as usize;
            let text = tag.get(12..12 + len)?;
            let text = text.split(|b| *b == 0).next().unwrap_or(text);
            Some(String::from_utf8_lossy(text).into_owned())
        }
        b"mluc" => {
            let len = read_u32(tag, 20)? as usize;
            let start = read_u32(tag, 24)? as usize;
            let units: Vec<u16> = tag
                .get(start..start + len)?
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        _ => None,
    }
}

/// True when a profile describes sRGB.
pub fn is_srgb(profile: &[u8]) -> bool {
    profile == srgb_profile()
        || profile_description(profile).is_some_and(|d| d.to_ascii_lowercase().contains("srgb"))
}

/// Display P3 primaries adapted to D50.
#[cfg(test)]
pub(crate) const P3_COLORANTS: [[f64; 3]; 3] = [
    [0.515_102_2, 0.241_182_2, -0.001_048_1],
    [0.291_965_0, 0.692_236_6, 0.041_881_1],
    [0.157_153_5, 0.066_581_0, 0.784_378_3],
];

fn push_entry(table: &mut Vec<u8>, signature: &[u8; 4], offset: u32, size: u32) {
    table.extend_from_slice(signature);
    table.extend_from_slice(&offset.to_be_bytes());
    table.extend_from_slice(&size.to_be_bytes());
}

fn description_tag(text: &str) -> Vec<u8> {
    let mut tag = Vec::with_capacity(12 + text.len() + 1 + 8 + 3 + 67);
    tag.extend_from_slice(b"desc");
    tag.extend_from_slice(&[0; 4]);
    tag.extend_from_slice(&((text.len() + 1) as u32).to_be_bytes());
    tag.extend_from_slice(text.as_bytes());
    tag.push(0);
    // Empty Unicode and ScriptCode records
    tag.extend_from_slice(&[0; 8]);
    tag.extend_from_slice(&[0; 3]);
    tag.extend_from_slice(&[0; 67]);
    tag
}

fn text_tag(text: &str) -> Vec<u8> {
    let mut tag = Vec::with_capacity(8 + text.len() + 1);
    tag.extend_from_slice(b"text");
    tag.extend_from_slice(&[0; 4]);
    tag.extend_from_slice(text.as_bytes());
    tag.push(0);
    tag
}

fn xyz_tag(xyz: [f64; 3]) -> Vec<u8> {
    let mut tag = Vec::with_capacity(20);
    tag.extend_from_slice(b"XYZ ");
    tag.extend_from_slice(&[0; 4]);
    tag.extend_from_slice(&s15_fixed16(xyz));
    tag
}

/// The sRGB transfer curve, sampled.
fn curve_tag() -> Vec<u8> {
    let mut tag = Vec::with_capacity(12 + TRC_ENTRIES * 2);
    tag.extend_from_slice(b"curv");
    tag.extend_from_slice(&[0; 4]);
    tag.extend_from_slice(&(TRC_ENTRIES as u32).to_be_bytes());
    for i in 0..TRC_ENTRIES {
        let encoded = i as f32 / (TRC_ENTRIES - 1) as f32;
        let linear = srgb_to_linear(encoded).clamp(0.0, 1.0);
        let value = (linear * 65535.0).round() as u16;
        tag.extend_from_slice(&value.to_be_bytes());
    }
    tag
}

fn s15_fixed16(xyz: [f64; 3]) -> [u8; 12] {
    let mut out = [0u8; 12];
    for (chunk, v) in out.chunks_exact_mut(4).zip(xyz) {
        chunk.copy_from_slice(&((v * 65536.0).round() as i32).to_be_bytes());
    }
    out
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
