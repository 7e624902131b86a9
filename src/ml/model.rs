use burn::{
    nn::{
        conv::{
            Conv2d, Conv2dConfig, Conv3d, Conv3dConfig, ConvTranspose2d, ConvTranspose2dConfig,
            ConvTranspose3d, ConvTranspose3dConfig,
        },
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, PaddingConfig3d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::mode::NetMode;

/// Channel count produced by the stem conv, consumed by the first
/// encoder stage. Fixed by the architecture, not configurable.
pub const STEM_CHANNELS: usize = 16;

/// Recombination blocks expand to `out_channels * EXPANSION_RATE`
/// before compressing back down.
const EXPANSION_RATE: usize = 2;

// ─── ConvBlock ────────────────────────────────────────────────────────────────
// conv → batch norm → ReLU, in either dimensionality.
//
// Exactly one of the planar/volumetric pairs is populated,
// decided once at construction by NetMode. Calling the forward
// of the other mode is a programming error and panics, the same
// way a shape mismatch would inside the framework.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv2: Option<Conv2d<B>>,
    conv3: Option<Conv3d<B>>,
    // BatchNorm's forward is rank-generic, so one instance serves
    // both dimensionalities
    norm: BatchNorm<B>,
}

impl<B: Backend> ConvBlock<B> {
    /// `kernel` is the square/cubic kernel size; `padding` keeps the
    /// spatial dims unchanged (0 for 1x1 convs, 1 for 3x3 convs).
    fn new(
        mode: NetMode,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
        device: &B::Device,
    ) -> Self {
        let (conv2, conv3) = match mode {
            NetMode::Planar => (
                Some(
                    Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
                        .with_padding(PaddingConfig2d::Explicit(padding, padding))
                        .init(device),
                ),
                None,
            ),
            NetMode::Volumetric => (
                None,
                Some(
                    Conv3dConfig::new([in_channels, out_channels], [kernel, kernel, kernel])
                        .with_padding(PaddingConfig3d::Explicit(padding, padding, padding))
                        .init(device),
                ),
            ),
        };
        Self {
            conv2,
            conv3,
            norm: BatchNormConfig::new(out_channels).init(device),
        }
    }

    fn forward_planar(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let conv = self.conv2.as_ref().expect("block was built in volumetric mode");
        relu(self.norm.forward(conv.forward(x)))
    }

    fn forward_volumetric(&self, x: Tensor<B, 5>) -> Tensor<B, 5> {
        let conv = self.conv3.as_ref().expect("block was built in planar mode");
        relu(self.norm.forward(conv.forward(x)))
    }
}

// ─── PointwiseConv ────────────────────────────────────────────────────────────
// A bare 1x1 conv (no norm, no activation) — the network stem and
// the final synthesis head.
#[derive(Module, Debug)]
pub struct PointwiseConv<B: Backend> {
    conv2: Option<Conv2d<B>>,
    conv3: Option<Conv3d<B>>,
}

impl<B: Backend> PointwiseConv<B> {
    fn new(mode: NetMode, in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        match mode {
            NetMode::Planar => Self {
                conv2: Some(Conv2dConfig::new([in_channels, out_channels], [1, 1]).init(device)),
                conv3: None,
            },
            NetMode::Volumetric => Self {
                conv2: None,
                conv3: Some(
                    Conv3dConfig::new([in_channels, out_channels], [1, 1, 1]).init(device),
                ),
            },
        }
    }

    fn forward_planar(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv2.as_ref().expect("conv was built in volumetric mode").forward(x)
    }

    fn forward_volumetric(&self, x: Tensor<B, 5>) -> Tensor<B, 5> {
        self.conv3.as_ref().expect("conv was built in planar mode").forward(x)
    }
}

// ─── RecombinationBlock ───────────────────────────────────────────────────────
/// The channel-expansion residual unit used at every resolution level
/// in place of a plain double conv:
///
/// ```text
///          ┌── skip:  1x1 conv → BN → ReLU ──────────────┐
///   input ─┤                                              +── output
///          └── 1x1 expand (out*2) → BN → ReLU6           │
///              → 3x3 refine → 1x1 zoom (out) ────────────┘
/// ```
///
/// The expansion gives the 3x3 conv a wider space to work in; the
/// zoom conv compresses back down before the residual addition.
#[derive(Module, Debug)]
pub struct RecombinationBlock<B: Backend> {
    expansion: ConvBlock<B>,
    bn: BatchNorm<B>,
    refine: ConvBlock<B>,
    zoom: ConvBlock<B>,
    skip: ConvBlock<B>,
    batch_normalization: bool,
}

impl<B: Backend> RecombinationBlock<B> {
    pub fn new(
        mode: NetMode,
        in_channels: usize,
        out_channels: usize,
        batch_normalization: bool,
        device: &B::Device,
    ) -> Self {
        let expanded = out_channels * EXPANSION_RATE;
        Self {
            expansion: ConvBlock::new(mode, in_channels, expanded, 1, 0, device),
            bn: BatchNormConfig::new(expanded).init(device),
            refine: ConvBlock::new(mode, expanded, expanded, 3, 1, device),
            zoom: ConvBlock::new(mode, expanded, out_channels, 1, 0, device),
            skip: ConvBlock::new(mode, in_channels, out_channels, 1, 0, device),
            batch_normalization,
        }
    }

    pub fn forward_planar(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.expansion.forward_planar(input.clone());
        if self.batch_normalization {
            x = self.bn.forward(x);
        }
        // ReLU6 before the refinement conv
        let x = x.clamp(0.0, 6.0);
        let x = self.refine.forward_planar(x);
        let x = self.zoom.forward_planar(x);

        x + self.skip.forward_planar(input)
    }

    pub fn forward_volumetric(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let mut x = self.expansion.forward_volumetric(input.clone());
        if self.batch_normalization {
            x = self.bn.forward(x);
        }
        let x = x.clamp(0.0, 6.0);
        let x = self.refine.forward_volumetric(x);
        let x = self.zoom.forward_volumetric(x);

        x + self.skip.forward_volumetric(input)
    }
}

// ─── Down ─────────────────────────────────────────────────────────────────────
/// One encoder stage: recombination block, then 2x max-pool.
/// Forward returns (pre-pool activation, pooled output) — the
/// pre-pool activation feeds the matching decoder skip connection.
#[derive(Module, Debug)]
pub struct Down<B: Backend> {
    conv: RecombinationBlock<B>,
    // Burn ships a MaxPool2d module but no MaxPool3d; the
    // volumetric path pools functionally via max_pool3d_2x.
    pool: Option<MaxPool2d>,
}

impl<B: Backend> Down<B> {
    pub fn new(mode: NetMode, in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let pool = match mode {
            NetMode::Planar => {
                Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
            }
            NetMode::Volumetric => None,
        };
        Self {
            conv: RecombinationBlock::new(mode, in_channels, out_channels, true, device),
            pool,
        }
    }

    pub fn forward_planar(&self, x: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let x = self.conv.forward_planar(x);
        let pooled = self
            .pool
            .as_ref()
            .expect("stage was built in volumetric mode")
            .forward(x.clone());
        (x, pooled)
    }

    pub fn forward_volumetric(&self, x: Tensor<B, 5>) -> (Tensor<B, 5>, Tensor<B, 5>) {
        let x = self.conv.forward_volumetric(x);
        let pooled = max_pool3d_2x(x.clone());
        (x, pooled)
    }
}

/// 2x max-pool over all three spatial axes of an NCDHW tensor.
///
/// Folds each axis into pairs and reduces with `max_dim`, which is
/// exactly MaxPool3d(kernel 2, stride 2). Every spatial dim must be
/// even — the harness validates divisibility before forwarding.
fn max_pool3d_2x<B: Backend>(x: Tensor<B, 5>) -> Tensor<B, 5> {
    let [n, c, d, h, w] = x.dims();
    let x = x
        .reshape([n, c, d, h, w / 2, 2])
        .max_dim(5)
        .reshape([n, c, d, h, w / 2]);
    let x = x
        .reshape([n, c, d, h / 2, 2, w / 2])
        .max_dim(4)
        .reshape([n, c, d, h / 2, w / 2]);
    x.reshape([n, c, d / 2, 2, h / 2, w / 2])
        .max_dim(3)
        .reshape([n, c, d / 2, h / 2, w / 2])
}

// ─── Up ───────────────────────────────────────────────────────────────────────
/// One decoder stage: 2x transposed conv on the lower-resolution
/// input, channel-concatenate with the encoder skip, recombine.
#[derive(Module, Debug)]
pub struct Up<B: Backend> {
    up2: Option<ConvTranspose2d<B>>,
    up3: Option<ConvTranspose3d<B>>,
    conv: RecombinationBlock<B>,
}

impl<B: Backend> Up<B> {
    /// `down_channels` come from the stage below, `skip_channels`
    /// from the matching encoder stage.
    pub fn new(
        mode: NetMode,
        down_channels: usize,
        skip_channels: usize,
        out_channels: usize,
        device: &B::Device,
    ) -> Self {
        let (up2, up3) = match mode {
            NetMode::Planar => (
                Some(
                    ConvTranspose2dConfig::new([down_channels, down_channels], [2, 2])
                        .with_stride([2, 2])
                        .init(device),
                ),
                None,
            ),
            NetMode::Volumetric => (
                None,
                Some(
                    ConvTranspose3dConfig::new([down_channels, down_channels], [2, 2, 2])
                        .with_stride([2, 2, 2])
                        .init(device),
                ),
            ),
        };
        Self {
            up2,
            up3,
            conv: RecombinationBlock::new(
                mode,
                skip_channels + down_channels,
                out_channels,
                true,
                device,
            ),
        }
    }

    pub fn forward_planar(&self, down_x: Tensor<B, 4>, skip_x: Tensor<B, 4>) -> Tensor<B, 4> {
        let up = self
            .up2
            .as_ref()
            .expect("stage was built in volumetric mode")
            .forward(down_x);
        self.conv.forward_planar(Tensor::cat(vec![up, skip_x], 1))
    }

    pub fn forward_volumetric(&self, down_x: Tensor<B, 5>, skip_x: Tensor<B, 5>) -> Tensor<B, 5> {
        let up = self
            .up3
            .as_ref()
            .expect("stage was built in planar mode")
            .forward(down_x);
        self.conv.forward_volumetric(Tensor::cat(vec![up, skip_x], 1))
    }
}

// ─── UNet ─────────────────────────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct UNetConfig {
    /// Input channel count (1 for a single MR sequence)
    pub in_channels: usize,
    /// Output channels per encoder stage; the last entry is the bridge
    pub filters: [usize; 5],
    /// Output channel count (1 for CT synthesis)
    pub class_num: usize,
    /// Convolutional dimensionality
    pub mode: NetMode,
}

impl UNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        let mode = self.mode;
        let [f0, f1, f2, f3, f4] = self.filters;

        UNet {
            stem: PointwiseConv::new(mode, self.in_channels, STEM_CHANNELS, device),
            down1: Down::new(mode, STEM_CHANNELS, f0, device),
            down2: Down::new(mode, f0, f1, device),
            down3: Down::new(mode, f1, f2, device),
            down4: Down::new(mode, f2, f3, device),
            bridge: RecombinationBlock::new(mode, f3, f4, true, device),
            up1: Up::new(mode, f4, f3, f3, device),
            up2: Up::new(mode, f3, f2, f2, device),
            up3: Up::new(mode, f2, f1, f1, device),
            up4: Up::new(mode, f1, f0, f0, device),
            head: PointwiseConv::new(mode, f0, self.class_num, device),
        }
    }
}

/// Encoder-decoder network with recombination blocks at every
/// resolution level and skip connections between matching levels.
///
/// Four pooling stages mean the spatial input dims must be
/// divisible by 16; the output spatial shape equals the input's.
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    stem: PointwiseConv<B>,
    down1: Down<B>,
    down2: Down<B>,
    down3: Down<B>,
    down4: Down<B>,
    bridge: RecombinationBlock<B>,
    up1: Up<B>,
    up2: Up<B>,
    up3: Up<B>,
    up4: Up<B>,
    head: PointwiseConv<B>,
}

impl<B: Backend> UNet<B> {
    /// input: [batch, in_channels, H, W] → [batch, class_num, H, W]
    pub fn forward_planar(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.stem.forward_planar(input);

        let (skip1, x) = self.down1.forward_planar(x);
        let (skip2, x) = self.down2.forward_planar(x);
        let (skip3, x) = self.down3.forward_planar(x);
        let (skip4, x) = self.down4.forward_planar(x);

        let x = self.bridge.forward_planar(x);

        let x = self.up1.forward_planar(x, skip4);
        let x = self.up2.forward_planar(x, skip3);
        let x = self.up3.forward_planar(x, skip2);
        let x = self.up4.forward_planar(x, skip1);

        self.head.forward_planar(x)
    }

    /// input: [batch, in_channels, D, H, W] → [batch, class_num, D, H, W]
    pub fn forward_volumetric(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let x = self.stem.forward_volumetric(input);

        let (skip1, x) = self.down1.forward_volumetric(x);
        let (skip2, x) = self.down2.forward_volumetric(x);
        let (skip3, x) = self.down3.forward_volumetric(x);
        let (skip4, x) = self.down4.forward_volumetric(x);

        let x = self.bridge.forward_volumetric(x);

        let x = self.up1.forward_volumetric(x, skip4);
        let x = self.up2.forward_volumetric(x, skip3);
        let x = self.up3.forward_volumetric(x, skip2);
        let x = self.up4.forward_volumetric(x, skip1);

        self.head.forward_volumetric(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn device() -> burn::backend::ndarray::NdArrayDevice {
        Default::default()
    }

    #[test]
    fn test_recombination_block_planar_shape() {
        let device = device();
        let block = RecombinationBlock::<TB>::new(NetMode::Planar, 3, 8, true, &device);
        let x = Tensor::<TB, 4>::zeros([1, 3, 16, 16], &device);
        assert_eq!(block.forward_planar(x).dims(), [1, 8, 16, 16]);
    }

    #[test]
    fn test_recombination_block_without_batch_norm() {
        let device = device();
        let block = RecombinationBlock::<TB>::new(NetMode::Planar, 2, 4, false, &device);
        let x = Tensor::<TB, 4>::zeros([1, 2, 8, 8], &device);
        assert_eq!(block.forward_planar(x).dims(), [1, 4, 8, 8]);
    }

    #[test]
    fn test_recombination_block_volumetric_shape() {
        let device = device();
        let block = RecombinationBlock::<TB>::new(NetMode::Volumetric, 2, 4, true, &device);
        let x = Tensor::<TB, 5>::zeros([1, 2, 4, 8, 8], &device);
        assert_eq!(block.forward_volumetric(x).dims(), [1, 4, 4, 8, 8]);
    }

    #[test]
    fn test_max_pool3d_halves_and_selects_maxima() {
        let device = device();
        let x = Tensor::<TB, 1>::from_floats(
            [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0].as_slice(),
            &device,
        )
        .reshape([1, 1, 2, 2, 2]);
        let pooled = max_pool3d_2x(x);
        assert_eq!(pooled.dims(), [1, 1, 1, 1, 1]);
        let values = pooled.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![7.0]);
    }

    #[test]
    fn test_unet_planar_preserves_spatial_shape() {
        let device = device();
        let model: UNet<TB> =
            UNetConfig::new(1, [4, 6, 8, 12, 16], 1, NetMode::Planar).init(&device);
        let x = Tensor::<TB, 4>::zeros([1, 1, 32, 32], &device);
        assert_eq!(model.forward_planar(x).dims(), [1, 1, 32, 32]);
    }

    #[test]
    fn test_unet_planar_multi_class_output() {
        let device = device();
        let model: UNet<TB> =
            UNetConfig::new(2, [4, 6, 8, 12, 16], 3, NetMode::Planar).init(&device);
        let x = Tensor::<TB, 4>::zeros([2, 2, 16, 16], &device);
        assert_eq!(model.forward_planar(x).dims(), [2, 3, 16, 16]);
    }

    #[test]
    fn test_unet_volumetric_preserves_spatial_shape() {
        let device = device();
        let model: UNet<TB> =
            UNetConfig::new(1, [2, 3, 4, 5, 6], 1, NetMode::Volumetric).init(&device);
        let x = Tensor::<TB, 5>::zeros([1, 1, 16, 16, 16], &device);
        assert_eq!(model.forward_volumetric(x).dims(), [1, 1, 16, 16, 16]);
    }
}
