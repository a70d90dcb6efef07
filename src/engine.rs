//! Core dispatch. One [`Event`] at a time,
//! run to completion, single-threaded: ingress events reach MAC, MAC
//! feeds DLC, DLC-completed SDUs are offered to the NWK sink and, where
//! recognized, the MM side-channel; MM's derived keys flow back into
//! the MAC layer's ciphering state. The handle/cluster manager (4.G) is
//! the only thing that mutates the slot map.

use core::time::Duration;

use crate::ari::Ipui;
use crate::error::ProtocolError;
use crate::events::{Event, MacMeInfoKind};
use crate::handle::ClusterHandle;
use crate::ids::TbcId;
use crate::mac::{self, Direction, MacControl, TailId, Tbc, TbcState};
use crate::mm::{self, MmOutcome};
use crate::nwk::{self, NwkSink};
use crate::runtime::EventLoop;
use crate::state::MonitorState;
use crate::trace;

/// "a silence of more than one multiframe without any expected bearer
/// traffic". One DECT multiframe is 16 frames of 10ms
/// each; two multiframes gives headroom against jitter in burst
/// delivery before declaring a TBC dead.
pub const TBC_SILENCE_TIMEOUT: Duration = Duration::from_millis(320);

fn ipui_from_pmid(pmid: crate::ari::Pmid) -> Ipui {
    let raw = pmid.get().to_be_bytes();
    Ipui([0, raw[0], raw[1], raw[2], raw[3]])
}

/// Cancels `tbc_id`'s current silence timer, if any, and registers a
/// fresh one. Called whenever traffic is observed on the TBC so that
/// established calls aren't torn down out from under them.
fn refresh_silence_timer(state: &mut MonitorState, ev: &mut impl EventLoop, tbc_id: TbcId) {
    if let Some(old) = state.tbc(tbc_id).silence_timer {
        ev.cancel_timer(old);
    }
    let timer = state.next_timer_id();
    state.tbc_mut(tbc_id).silence_timer = Some(timer);
    ev.register_timer(timer, TBC_SILENCE_TIMEOUT);
}

/// Tears down `tbc_id`: frees its slots, cancels its silence timer, and
/// reclaims its PT if it is now idle.
fn teardown_tbc(
    state: &mut MonitorState,
    ev: &mut impl EventLoop,
    handle: crate::ids::HandleId,
    tbc_id: TbcId,
) {
    if let Some(tbc) = state.remove_tbc(tbc_id) {
        state.handle_mut(handle).free_tbc_slots(tbc_id);
        if let Some(timer) = tbc.silence_timer {
            ev.cancel_timer(timer);
        }
        let pt = state.pt_mut(tbc.pt);
        if pt.dl == Some(tbc_id) {
            pt.dl = None;
        }
        state.reclaim_pt_if_idle(tbc.pt);
    }
}

fn on_mac_control(
    state: &mut MonitorState,
    ev: &mut impl EventLoop,
    handle: crate::ids::HandleId,
    slot: u8,
    mc: MacControl,
) -> Result<(), ProtocolError> {
    match mc {
        MacControl::AccessRequest { fmid, pmid, duplex } => {
            let peer = duplex.then(|| crate::ingress::RawBurst::duplex_peer(slot));
            let pt_id = state.pt_for(ipui_from_pmid(pmid));
            let tbc_id = state.add_tbc(Tbc::new(slot, peer, fmid, pmid, pt_id));
            state
                .handle_mut(handle)
                .occupy_slots(slot, peer, tbc_id)
                .map_err(|e| {
                    state.remove_tbc(tbc_id);
                    e
                })?;
            state.pt_mut(pt_id).dl = Some(tbc_id);
            refresh_silence_timer(state, ev, tbc_id);
            trace::mac(&state.handle(handle).name, &format!("TBC requested at slot {slot}"));
        }
        MacControl::BearerConfirm { .. } => {
            if let Some(tbc_id) = state.handle(handle).slot_at(slot) {
                state.tbc_mut(tbc_id).state = TbcState::Established;
                trace::mac(&state.handle(handle).name, &format!("TBC established at slot {slot}"));
            }
        }
        MacControl::Release => {
            if let Some(tbc_id) = state.handle(handle).slot_at(slot) {
                teardown_tbc(state, ev, handle, tbc_id);
                trace::mac(&state.handle(handle).name, &format!("TBC released at slot {slot}"));
            }
        }
    }
    Ok(())
}

/// Feeds one C-plane segment through MAC sequence tracking and DLC
/// reassembly, and on completion offers the SDU to NWK / the MM
/// side-channel.
fn on_signalling_segment(
    state: &mut MonitorState,
    ev: &mut impl EventLoop,
    sink: &mut impl NwkSink,
    handle: crate::ids::HandleId,
    slot: u8,
    seq_bit: bool,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let Some(tbc_id) = state.handle(handle).slot_at(slot) else {
        return Err(mac::MacError::NoSuchTbc { slot }.into());
    };
    refresh_silence_timer(state, ev, tbc_id);
    let is_primary = state.tbc(tbc_id).slot1 == slot;
    let direction = if is_primary {
        Direction::FpToPt
    } else {
        Direction::PtToFp
    };

    let tbc = state.tbc_mut(tbc_id);
    let mbc = tbc.mbc(direction);
    if !mbc.accept_cs(seq_bit) {
        return Ok(()); // duplicate retransmission, discarded
    }
    let complete = mbc.mc.lc.feed(payload)?;

    if let crate::dlc::LcFeedResult::Complete(sdu) = complete {
        let pt = state.tbc(tbc_id).pt;
        let ipui = state.pt(pt).ipui;
        trace::dlc(&state.handle(handle).name, &format!("Lc SDU complete, {} bytes", sdu.len()));

        if let Some(mm_msg) = nwk::recognize_mm_message(&sdu) {
            let auth_pin = state.auth_pin.clone();
            let pt_mut = state.pt_mut(pt);
            match mm::handle_mm_message(pt_mut, &auth_pin, mm_msg) {
                Ok(MmOutcome::CipheringActivated(dck)) => {
                    state.tbc_mut(tbc_id).ciphered = true;
                    trace::mac(&state.handle(handle).name, &format!("ciphering activated, dck={dck:#018x}"));
                }
                Ok(_) => {}
                Err(e) => trace::mac(&state.handle(handle).name, &format!("MM error: {e}")),
            }
        }

        sink.deliver(nwk::NwkSdu {
            direction: nwk::Direction::FpToPt,
            pt: ipui,
            bytes: sdu,
        });
    }
    Ok(())
}

/// Decrypts (if ciphered) and reassembles one burst's B-field into the
/// U-plane for its PT's audio handle.
fn on_b_field(
    state: &mut MonitorState,
    ev: &mut impl EventLoop,
    handle: crate::ids::HandleId,
    burst: &crate::ingress::RawBurst,
) {
    let Some(tbc_id) = state.handle(handle).slot_at(burst.slot) else {
        return;
    };
    refresh_silence_timer(state, ev, tbc_id);
    let tbc = state.tbc(tbc_id);
    if !tbc.ciphered {
        return;
    }
    let is_primary = tbc.slot1 == burst.slot;
    let pt_id = tbc.pt;
    let Some(dck) = state.pt(pt_id).dck else {
        return; // a ciphered TBC whose DCK can't be derived stays undecrypted
    };

    let mut b_field = burst.b_field.clone();
    mac::decrypt_b_field(&mut b_field, is_primary, burst.mfn, burst.frame, dck);

    let direction = if is_primary {
        nwk::Direction::FpToPt
    } else {
        nwk::Direction::PtToFp
    };
    let pt = state.pt_mut(pt_id);
    let audio = pt.audio.get_or_insert_with(crate::audio::AudioHandle::new);
    audio.push(direction, &b_field);
}

/// Dispatches one [`Event`] to completion.
pub fn dispatch(
    state: &mut MonitorState,
    ev: &mut impl EventLoop,
    sink: &mut impl NwkSink,
    event: Event,
) -> Result<(), ProtocolError> {
    match event {
        Event::MacMeInfo { handle, kind } => {
            match kind {
                MacMeInfoKind::Pari(pari) => ClusterHandle::on_mac_me_info(state, ev, handle, pari),
                MacMeInfoKind::Capabilities(fpc) => {
                    ClusterHandle::on_capabilities(state, ev, handle, fpc)
                }
            }
            Ok(())
        }

        Event::TimerFired(timer) => {
            let lock_timeout_handle = state
                .handles
                .iter()
                .find(|(_, h)| h.lock_timer == Some(timer))
                .map(|(i, _)| crate::ids::HandleId(i));
            if let Some(handle) = lock_timeout_handle {
                ClusterHandle::on_lock_timeout(state, ev, handle);
                return Ok(());
            }

            let silent_tbc = state
                .tbcs
                .iter()
                .find(|(_, t)| t.silence_timer == Some(timer))
                .map(|(i, _)| TbcId(i));
            if let Some(tbc_id) = silent_tbc {
                // The owning handle isn't directly reachable from the TBC;
                // scan handles for the one whose slot map references it.
                let owner = state
                    .handles
                    .iter()
                    .find(|(_, h)| h.slot_at(state.tbc(tbc_id).slot1) == Some(tbc_id))
                    .map(|(i, _)| crate::ids::HandleId(i));
                if let Some(handle) = owner {
                    teardown_tbc(state, ev, handle, tbc_id);
                }
            }
            Ok(())
        }

        Event::Burst { handle, burst } => {
            let (tail, payload) = mac::classify_tail(&burst.a_field)?;
            match tail {
                TailId::Mt => {
                    let mc = mac::parse_mac_control(payload)?;
                    on_mac_control(state, ev, handle, burst.slot, mc)?;
                }
                TailId::Ct | TailId::Nt | TailId::Pt => {
                    let seq_bit = payload.first().copied().unwrap_or(0) & 1 != 0;
                    on_signalling_segment(state, ev, sink, handle, burst.slot, seq_bit, payload)?;
                }
                TailId::Identities | TailId::Paging | TailId::QChannel | TailId::Reserved => {
                    // Non-signalling tails only update system knowledge
                    // already captured by the handle/cluster manager.
                }
            }
            on_b_field(state, ev, handle, &burst);
            Ok(())
        }
    }
}
