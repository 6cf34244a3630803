//! Translation of logical filter names to mpv filter chains.
//!
//! Many names come from mplayer and have no mpv filter of their own; most map
//! to a libavfilter chain wrapped in `lavfi=[...]`.

/// Outcome of translating a filter request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
  /// Filter chain entry for `--vf-add`/`--af-add` or `vf add`/`af add`.
  Filter(String),
  /// The player already does this without a filter.
  Builtin,
  /// Known name with no equivalent; the user should be told.
  Unsupported,
  /// Never heard of it.
  Unknown,
}

impl Translation {
  /// Name the player lists the filter under, used for capability checks.
  pub fn base_name(&self) -> Option<&str> {
    match self {
      Translation::Filter(chain) => chain.split(['=', ':', '[']).next(),
      _ => None,
    }
  }
}

fn lavfi(graph: impl AsRef<str>) -> Translation {
  Translation::Filter(format!("lavfi=[{}]", graph.as_ref()))
}

fn with_option(base: &str, option: &str) -> String {
  if option.is_empty() {
    base.to_string()
  } else {
    format!("{}={}", base, option)
  }
}

pub fn video_filter(name: &str, option: &str) -> Translation {
  match name {
    "flip" => Translation::Filter("vflip".into()),
    "mirror" => Translation::Filter("hflip".into()),
    "rotate" => {
      let dir = option.parse::<u8>().ok().filter(|d| *d <= 3).unwrap_or(1);
      lavfi(format!("transpose={}", dir))
    }
    "blur" => lavfi("unsharp=la=-1.5:ca=-1.5"),
    "sharpen" => lavfi("unsharp=la=1.5:ca=1.5"),
    "noise" => lavfi("noise=alls=9:allf=t"),
    "deblock" => lavfi("pp=vb/hb"),
    "dering" => lavfi("pp=dr"),
    "postprocessing" | "pp" => lavfi(with_option("pp", option)),
    "lb" | "l5" => lavfi(format!("pp={}", name)),
    "denoise_normal" | "hqdn3d" => lavfi(with_option("hqdn3d", option)),
    "denoise_soft" => lavfi("hqdn3d=2:1:2"),
    "yadif" => lavfi(with_option("yadif", option)),
    "kerndeint" => lavfi("kerndeint=5"),
    "gradfun" => lavfi("gradfun"),
    "stereo3d" => lavfi(with_option("stereo3d", option)),
    "crop" => lavfi(with_option("crop", option)),
    "scale" => lavfi(with_option("scale", option)),
    "letterbox" | "expand" => {
      let aspect = if option.is_empty() { "16/9" } else { option };
      lavfi(format!("pad=iw:iw/({}):0:(oh-ih)/2", aspect))
    }
    "format" => Translation::Filter(with_option("format", option)),
    "screenshot" | "ass" | "eq2" | "harddup" | "softskip" | "subs_on_screenshots" => Translation::Builtin,
    "tfields" | "filmdint" | "ilpack" | "softpulldown" | "framestep" => Translation::Unsupported,
    _ => Translation::Unknown,
  }
}

/// Center frequencies of the 10-band equalizer, in Hz.
const EQ_BANDS: [&str; 10] = ["31.25", "62.5", "125", "250", "500", "1000", "2000", "4000", "8000", "16000"];

fn equalizer(option: &str) -> Translation {
  let gains: Vec<&str> = option.split(':').filter(|g| !g.is_empty()).collect();
  if gains.is_empty() {
    return lavfi("firequalizer");
  }
  let entries: Vec<String> = EQ_BANDS
    .iter()
    .zip(gains.iter().copied().chain(std::iter::repeat("0")))
    .map(|(freq, gain)| format!("entry({},{})", freq, gain))
    .collect();
  lavfi(format!("firequalizer=gain_entry='{}'", entries.join(";")))
}

pub fn audio_filter(name: &str, option: &str) -> Translation {
  match name {
    "volnorm" => lavfi("dynaudnorm"),
    "karaoke" => lavfi("stereotools=mlev=0.015625"),
    "extrastereo" => match option {
      "" => lavfi("extrastereo"),
      m => lavfi(format!("extrastereo=m={}", m)),
    },
    "earwax" => lavfi("earwax"),
    "scaletempo" => Translation::Filter(with_option("scaletempo", option)),
    "equalizer" => equalizer(option),
    "volume" => lavfi(with_option("volume", option)),
    "resample" => lavfi(with_option("aresample", option)),
    "channels" => Translation::Builtin,
    "hrtf" | "surround" | "sweep" | "center" => Translation::Unsupported,
    _ => Translation::Unknown,
  }
}
