//! Shared fixtures for unit tests.

use std::path::{Path, PathBuf};

/// Shell stand-in for ffmpeg: answers the runtime probes, reports progress
/// for a 10s clip and writes the first 64 input bytes as output. Inputs
/// containing `CORRUPT` fail like a broken container.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
case "$*" in
  *-version*) echo "ffmpeg version 6.1-test Copyright (c) 2000-2023 the FFmpeg developers"; exit 0 ;;
  *-encoders*) printf ' V....D libx264              libx264 H.264 / AVC\n A....D aac                  AAC (Advanced Audio Coding)\n'; exit 0 ;;
esac
input=""
prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then input="$arg"; fi
  prev="$arg"
  out="$arg"
done
if grep -q CORRUPT "$input"; then
  echo "$input: Invalid data found when processing input" >&2
  exit 1
fi
echo "  Duration: 00:00:10.00, start: 0.000000, bitrate: 800 kb/s" >&2
echo "out_time_us=2500000" >&2
echo "progress=continue" >&2
echo "out_time_us=5000000" >&2
echo "progress=end" >&2
head -c 64 "$input" > "$out"
"#;

/// Writes the fake ffmpeg into `dir` and returns its path
pub fn write_fake_ffmpeg(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, FAKE_FFMPEG).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
