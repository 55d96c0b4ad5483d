//! Test SVG documents.

/// Four colored shapes in a 588x588 viewBox, plus ids on non-visible tags.
pub const EXAMPLE_SVG: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Four shapes for image map tests -->
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.1" viewBox="0 0 588 588">
  <title id="title">Shapes</title>
  <defs id="defs">
    <linearGradient id="shade" x1="0" y1="0" x2="1" y2="1">
      <stop offset="0" stop-color="#fff"/>
      <stop offset="1" stop-color="#000"/>
    </linearGradient>
  </defs>
  <g transform="translate(10,10)">
    <rect id="red" x="20" y="20" width="240" height="240" fill="#e00"/>
    <circle id="yellow" cx="430" cy="140" r="120" fill="#ee0"/>
    <ellipse id="blue" cx="140" cy="430" rx="120" ry="90" fill="#00e"/>
    <path id="green" d="M310 310h240v240h-240z" fill="#0e0"/>
  </g>
</svg>
"##;

pub const IDS_IN_EXAMPLE_SVG: [&str; 4] = ["red", "yellow", "blue", "green"];

/// Same geometry as [`EXAMPLE_SVG`] with renamed ids and hard-coded size.
pub const EXAMPLE2_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="588" height="588">
  <g>
    <rect id="punainen" x="20" y="20" width="240" height="240" fill="#e00"/>
    <circle id="keltainen" cx="430" cy="140" r="120" fill="#ee0"/>
    <ellipse id="sininen" cx="140" cy="430" rx="120" ry="90" fill="#00e"/>
    <path id="vihrea" d="M310 310h240v240h-240z" fill="#0e0"/>
  </g>
</svg>
"##;

pub const IDS_IN_EXAMPLE2_SVG: [&str; 4] = ["punainen", "keltainen", "sininen", "vihrea"];

/// Illustrator-style export: namespace URIs come from internal DTD entities.
pub const ILLUSTRATOR_SVG: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<!-- Generator: Adobe Illustrator 16.0.0, SVG Export Plug-In -->
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" [
	<!ENTITY ns_svg "http://www.w3.org/2000/svg">
	<!ENTITY ns_xlink "http://www.w3.org/1999/xlink">
	<!ENTITY room "Meeting room">
]>
<svg version="1.1" xmlns="&ns_svg;" xmlns:xlink="&ns_xlink;" width="200" height="100" viewBox="0 0 200 100">
<g id="floor">
	<rect id="room_a" x="0" y="0" width="100" height="100" fill="#ccc"/>
	<rect id="room_b" x="100" y="0" width="100" height="100" fill="#aaa"/>
	<text id="label" x="10" y="50">&room; A</text>
</g>
</svg>
"##;

pub const IDS_IN_ILLUSTRATOR_SVG: [&str; 4] = ["room_a", "room_b", "label", "floor"];
