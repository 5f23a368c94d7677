/// Device and surface settings.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface format when one is offered.
    ///
    /// Off by default: colors, textures and blending stay in display space,
    /// so a palette value of 0.5 is written to the framebuffer as 0.5.
    pub prefer_srgb: bool,

    /// Stimulus presentation wants one frame per refresh, so this defaults
    /// to `Fifo` (vsync).
    pub present_mode: wgpu::PresentMode,

    /// Requested alpha mode; falls back to the first supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Frames the swapchain may queue ahead. Lower means less latency
    /// between `on_frame` and photons.
    pub desired_maximum_frame_latency: u32,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 1,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}
