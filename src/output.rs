//! Image sinks for the exposure buffer: TEV live view, PNG, EXR.
//!
//! All sinks read the accumulated frame straight out of an
//! [`ExposureBuffer`]: TEV receives the linear values for progressive
//! viewing, PNG gets the sRGB transfer applied, EXR keeps full linear HDR
//! precision. Failures are logged and never abort a render.

use std::net::TcpStream;

use exr::prelude::*;
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use tev_client::{PacketCreateImage, PacketUpdateImage, TevClient};

use crate::exposure::ExposureBuffer;

/// Name under which the render appears in the TEV viewer.
const TEV_IMAGE_NAME: &str = "octray";

/// TEV's default listening port.
const TEV_DEFAULT_PORT: u16 = 14158;

const TEV_CHANNELS: [&str; 3] = ["R", "G", "B"];

/// Push the buffer's current accumulation to a TEV instance for live
/// viewing.
///
/// `address` is `ip:port`, or a bare host which gets TEV's default port.
/// The image is created (or replaced) under one fixed name, so calling
/// this once per accumulated frame yields a progressively refining view.
pub fn send_to_tev(exposure: &ExposureBuffer, address: &str) {
    let address = if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:{TEV_DEFAULT_PORT}")
    };

    let stream = match TcpStream::connect(&address) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to connect to TEV on {address}: {e}");
            return;
        }
    };
    // Frame updates are small and frequent; don't batch them.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY: {e}");
    }
    let mut client = TevClient::wrap(stream);

    let (width, height) = (exposure.width(), exposure.height());
    let create = PacketCreateImage {
        image_name: TEV_IMAGE_NAME,
        width,
        height,
        channel_names: &TEV_CHANNELS,
        grab_focus: false,
    };
    if let Err(e) = client.send(create) {
        warn!("Failed to create image in TEV: {e}");
        return;
    }

    // TEV takes planar channel data (all R, then all G, then all B), so
    // regroup the buffer's interleaved pixels channel by channel.
    let image = exposure.to_image();
    let planar: Vec<f32> = (0..3)
        .flat_map(|channel| image.pixels().map(move |pixel| pixel[channel]))
        .collect();

    let pixel_count = u64::from(width) * u64::from(height);
    let update = PacketUpdateImage {
        image_name: TEV_IMAGE_NAME,
        grab_focus: false,
        channel_names: &TEV_CHANNELS,
        x: 0,
        y: 0,
        width,
        height,
        channel_offsets: &[0, pixel_count, 2 * pixel_count],
        channel_strides: &[1, 1, 1],
        data: &planar,
    };
    match client.send(update) {
        Ok(_) => debug!("Frame sent to TEV at {address}"),
        Err(e) => warn!("Failed to send image data to TEV: {e}"),
    }
}

/// Linear light to the sRGB transfer curve, clamped to `[0, 1]`: the
/// 12.92 linear segment below 0.0031308, the 1/2.4 power curve above.
fn linear_to_srgb(linear: f32) -> f32 {
    let linear = linear.clamp(0.0, 1.0);
    if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Save the accumulated image as an 8-bit PNG with the sRGB transfer
/// applied. I/O failures are logged, not propagated.
pub fn save_png(exposure: &ExposureBuffer, path: &str) {
    let data: Vec<u8> = exposure
        .to_image()
        .pixels()
        .flat_map(|pixel| pixel.0)
        .map(|channel| (linear_to_srgb(channel) * 255.0) as u8)
        .collect();

    match RgbImage::from_raw(exposure.width(), exposure.height(), data) {
        Some(png) => match png.save(path) {
            Ok(_) => info!("Image saved as {path}"),
            Err(e) => warn!("Failed to save image: {e}"),
        },
        None => warn!("Exposure buffer dimensions do not match its data"),
    }
}

/// Save the accumulated image as a 32-bit linear EXR.
///
/// No tone mapping or transfer is applied; the file carries the exposure
/// buffer's light values as-is, which suits TEV and post-processing
/// workflows. I/O failures are logged, not propagated.
pub fn save_exr(exposure: &ExposureBuffer, path: &str) {
    let image = exposure.to_image();
    let result = write_rgb_file(
        path,
        exposure.width() as usize,
        exposure.height() as usize,
        |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x as u32, y as u32);
            (r, g, b)
        },
    );
    match result {
        Ok(_) => info!("HDR image saved as EXR: {path}"),
        Err(e) => warn!("Failed to save EXR image: {e}"),
    }
}
