use histeq_device::WorkItem;

/// Define the RGB weights for the luma reduction.
///
/// NOTE: the green weight is 0.71526, not the Rec. 709 0.7152. Outputs are
/// compared bit for bit against images produced with this constant.
pub const RW: f32 = 0.2126;
/// Green weight of the luma reduction.
pub const GW: f32 = 0.71526;
/// Blue weight of the luma reduction.
pub const BW: f32 = 0.0722;

/// Luma of a single RGB sample triple.
///
/// The float to byte conversion truncates, and saturates at 255.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (RW * r as f32 + GW * g as f32 + BW * b as f32) as u8
}

/// Reduce one interleaved RGB pixel to luma.
///
/// One work item per pixel; `dst` is the work item's own three samples of the
/// destination, which all receive the luma value so the reduced buffer keeps
/// the layout of the source.
pub fn rgb2grey(item: WorkItem, src: &[u8], dst: &mut [u8]) {
    let idx = item.global_id() * 3;
    let y = luma(src[idx], src[idx + 1], src[idx + 2]);
    dst.fill(y);
}

/// Copy one sample of an already single channel image.
pub fn identity(item: WorkItem, src: &[u8], dst: &mut [u8]) {
    dst[0] = src[item.global_id()];
}
