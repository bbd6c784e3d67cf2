//! Viewer page generation.
//!
//! The page shows one image, scaled to fit the viewport on a black
//! background, and polls the image route on a fixed interval. A new image is
//! loaded off-screen and only swapped in once fully decoded, so the visible
//! image never flickers or shows a partial frame.

use crate::config::schema::clamp_refresh_fps;

/// Poll interval in milliseconds for a browser refresh rate.
pub fn poll_interval_ms(refresh_fps: f64) -> u64 {
    (1000.0 / clamp_refresh_fps(refresh_fps)).floor() as u64
}

/// Render the page for `image_route`, polling at `refresh_fps`.
pub fn render_viewer_page(image_route: &str, refresh_fps: f64) -> String {
    let interval_ms = poll_interval_ms(refresh_fps);
    VIEWER_TEMPLATE
        .replace("{{IMAGE_ROUTE}}", image_route)
        .replace("{{INTERVAL_MS}}", &interval_ms.to_string())
}

const VIEWER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Screen Viewer</title>
<style>
  html, body { margin: 0; height: 100%; background: #000; overflow: hidden; }
  body { display: flex; align-items: center; justify-content: center; }
  #screen { max-width: 100vw; max-height: 100vh; object-fit: contain; }
</style>
</head>
<body>
<img id="screen" alt="">
<script>
  const route = "{{IMAGE_ROUTE}}";
  const intervalMs = {{INTERVAL_MS}};
  const screen = document.getElementById("screen");
  let loading = false;

  function refresh() {
    if (loading) return;
    loading = true;
    const next = new Image();
    next.onload = () => { screen.src = next.src; loading = false; };
    next.onerror = () => { loading = false; };
    next.src = route + "?t=" + Date.now();
  }

  refresh();
  setInterval(refresh, intervalMs);
</script>
</body>
</html>
"#;
