//! Slideshow video and GIF encoding.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use promo_models::encoding::{
    DEFAULT_CRF, DEFAULT_PIX_FMT, DEFAULT_PRESET, DEFAULT_VIDEO_CODEC, GIF_FPS, GIF_WIDTH,
    SLIDE_FADE_SECS, VIDEO_FPS, VIDEO_HEIGHT, VIDEO_WIDTH,
};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the slideshow command: every image letterboxed to the vertical
/// frame, shown for `seconds_per_image`, faded in, then concatenated.
pub fn slideshow_command(images: &[PathBuf], seconds_per_image: f64, output: &Path) -> MediaResult<FfmpegCommand> {
    if images.is_empty() {
        return Err(MediaError::invalid_input("slideshow needs at least one image"));
    }
    if seconds_per_image.is_nan() || seconds_per_image <= 0.0 {
        return Err(MediaError::invalid_input("seconds per image must be positive"));
    }

    let fade = SLIDE_FADE_SECS.min(seconds_per_image / 2.0);
    let mut cmd = FfmpegCommand::new(output);
    let mut filters = Vec::with_capacity(images.len() + 1);
    let mut labels = String::new();

    for (i, image) in images.iter().enumerate() {
        cmd = cmd.looped_image(image, seconds_per_image);

        let mut chain = format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=white,setsar=1,fps={fps},format={pix}",
            i = i,
            w = VIDEO_WIDTH,
            h = VIDEO_HEIGHT,
            fps = VIDEO_FPS,
            pix = DEFAULT_PIX_FMT,
        );
        if i > 0 {
            chain.push_str(&format!(",fade=t=in:st=0:d={:.2}", fade));
        }
        chain.push_str(&format!("[v{}]", i));
        filters.push(chain);
        labels.push_str(&format!("[v{}]", i));
    }

    filters.push(format!("{}concat=n={}:v=1:a=0[out]", labels, images.len()));

    Ok(cmd
        .filter_complex(filters.join(";"))
        .map("[out]")
        .video_codec(DEFAULT_VIDEO_CODEC)
        .preset(DEFAULT_PRESET)
        .crf(DEFAULT_CRF)
        .pixel_format(DEFAULT_PIX_FMT)
        .output_args(["-movflags", "+faststart"]))
}

/// Encode a slideshow MP4 from still images.
pub async fn render_slideshow(
    runner: &FfmpegRunner,
    images: &[PathBuf],
    seconds_per_image: f64,
    output: &Path,
) -> MediaResult<()> {
    let cmd = slideshow_command(images, seconds_per_image, output)?;
    let total_ms = (images.len() as f64 * seconds_per_image * 1000.0) as i64;

    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(total_ms) as u32,
                frame = progress.frame,
                "Slideshow encode progress"
            );
        })
        .await?;

    info!(images = images.len(), output = %output.display(), "Rendered slideshow");
    Ok(())
}

/// Build the GIF conversion command (palette generated in one pass).
pub fn gif_command(video: &Path, output: &Path) -> FfmpegCommand {
    let filter = format!(
        "fps={fps},scale={w}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
        fps = GIF_FPS,
        w = GIF_WIDTH,
    );
    FfmpegCommand::new(output)
        .input(video)
        .filter_complex(filter)
        .output_args(["-loop", "0"])
}

/// Convert a video into a looping GIF.
pub async fn convert_to_gif(runner: &FfmpegRunner, video: &Path, output: &Path) -> MediaResult<()> {
    runner.run(&gif_command(video, output)).await?;
    info!(output = %output.display(), "Converted video to GIF");
    Ok(())
}

/// Build a single-image conversion (e.g. PNG screenshot to JPEG).
pub fn still_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(input)
        .single_frame()
        .output_args(["-q:v", "2"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slideshow_filter_graph() {
        let images = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg"), PathBuf::from("c.jpg")];
        let cmd = slideshow_command(&images, 2.0, Path::new("out.mp4")).unwrap();
        let args = cmd.build_args();

        assert_eq!(args.iter().filter(|a| *a == "-loop").count(), 3);
        let graph_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        let graph = &args[graph_at + 1];
        assert!(graph.starts_with("[0:v]scale=1080:1920"));
        assert!(!graph.split(';').next().unwrap().contains("fade"));
        assert!(graph.contains("[1:v]"));
        assert!(graph.contains("fade=t=in:st=0:d=0.40"));
        assert!(graph.ends_with("[v0][v1][v2]concat=n=3:v=1:a=0[out]"));
        assert!(args.contains(&"[out]".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_slideshow_rejects_bad_input() {
        assert!(slideshow_command(&[], 2.0, Path::new("o.mp4")).is_err());
        assert!(slideshow_command(&[PathBuf::from("a")], 0.0, Path::new("o.mp4")).is_err());
    }

    #[test]
    fn test_gif_uses_palette() {
        let args = gif_command(Path::new("in.mp4"), Path::new("out.gif")).build_args();
        let graph_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[graph_at + 1].contains("palettegen"));
        assert!(args[graph_at + 1].starts_with("fps=10,scale=480"));
        assert_eq!(args.last().map(String::as_str), Some("out.gif"));
    }
}
